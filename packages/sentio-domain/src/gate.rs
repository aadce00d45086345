#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
	RejectEmptyText,
	RejectTooLong,
	RejectInvalidUserId,
}
impl RejectCode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::RejectEmptyText => "REJECT_EMPTY_TEXT",
			Self::RejectTooLong => "REJECT_TOO_LONG",
			Self::RejectInvalidUserId => "REJECT_INVALID_USER_ID",
		}
	}
}

const MAX_USER_ID_CHARS: usize = 128;

/// Checks a submission before any external call is made. Length is counted in code points.
pub fn analysis_gate(text: &str, user_id: &str, max_text_chars: u32) -> Result<(), RejectCode> {
	user_id_gate(user_id)?;

	if text.trim().is_empty() {
		return Err(RejectCode::RejectEmptyText);
	}
	if text.chars().count() > max_text_chars as usize {
		return Err(RejectCode::RejectTooLong);
	}

	Ok(())
}

pub fn user_id_gate(user_id: &str) -> Result<(), RejectCode> {
	if user_id.trim().is_empty()
		|| user_id.chars().count() > MAX_USER_ID_CHARS
		|| user_id.chars().any(char::is_control)
	{
		return Err(RejectCode::RejectInvalidUserId);
	}

	Ok(())
}
