use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = sentio_api::Args::parse();

	sentio_api::run(args).await
}
