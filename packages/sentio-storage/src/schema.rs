pub fn render_schema() -> &'static str {
	include_str!("../../../sql/init.sql")
}

/// Splits the schema into individual statements, dropping empty fragments.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_splits_into_table_and_index() {
		let statements: Vec<&str> = statements(render_schema()).collect();

		assert_eq!(statements.len(), 2);
		assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS sentiment_records"));
		assert!(statements[1].starts_with("CREATE INDEX IF NOT EXISTS"));
	}
}
