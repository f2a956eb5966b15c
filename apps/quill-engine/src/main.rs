use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = quill_engine::Args::parse();

	quill_engine::run(args).await
}
