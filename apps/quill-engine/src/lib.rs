use std::{
	io::{self, Read},
	path::PathBuf,
	sync::Arc,
};

use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::eyre;
use serde::Serialize;

use quill_domain::ContentType;
use quill_service::{AddDocumentRequest, QuillService, SearchRequest, ServiceParts};
use quill_storage::DirProjectStore;

#[derive(Debug, Parser)]
#[command(
	version = quill_cli::VERSION,
	rename_all = "kebab",
	styles = quill_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Directory holding `<project_id>.txt` or `<project_id>.md` source files.
	#[arg(long, value_name = "DIR", default_value = "projects")]
	pub projects: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Chunk, enrich, and index a document.
	Ingest(IngestArgs),
	/// Run a ranked search and print the response.
	Search(SearchArgs),
	/// Create or fetch a project profile.
	Sync { project_id: String },
	/// Aggregate statistics for a project.
	Stats { project_id: String },
	/// Remove a project's chunks and profile.
	Delete { project_id: String },
	/// Cache counters after an optimizer pass.
	CacheStats,
}

#[derive(Debug, ClapArgs)]
pub struct IngestArgs {
	/// File to ingest. Reads stdin when omitted or `-`.
	pub file: Option<PathBuf>,
	#[arg(long)]
	pub project: Option<String>,
	#[arg(long)]
	pub user: Option<String>,
	#[arg(long, value_name = "TYPE")]
	pub content_type: Option<ContentType>,
	#[arg(long)]
	pub importance: Option<f32>,
}

#[derive(Debug, ClapArgs)]
pub struct SearchArgs {
	pub query: String,
	#[arg(long)]
	pub project: Option<String>,
	#[arg(long)]
	pub user: Option<String>,
	#[arg(long = "type", value_name = "TYPE")]
	pub content_types: Vec<ContentType>,
	#[arg(long = "theme")]
	pub themes: Vec<String>,
	#[arg(long = "character")]
	pub characters: Vec<String>,
	#[arg(long)]
	pub min_importance: Option<f32>,
	#[arg(long)]
	pub limit: Option<u32>,
	#[arg(long)]
	pub no_context: bool,
	#[arg(long)]
	pub no_insights: bool,
}
impl SearchArgs {
	fn into_request(self) -> SearchRequest {
		SearchRequest {
			query: self.query,
			project_id: self.project,
			user_id: self.user,
			content_types: self.content_types,
			themes: self.themes,
			characters: self.characters,
			min_importance: self.min_importance,
			time_range: None,
			limit: self.limit,
			include_context: Some(!self.no_context),
			include_insights: Some(!self.no_insights),
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = quill_config::load(&args.config)?;

	quill_cli::init_tracing(&config.service.log_level);

	let parts = ServiceParts::new(Arc::new(DirProjectStore::new(&args.projects)));
	let service = QuillService::open(config, parts).await?;
	let optimizer = service.spawn_cache_optimizer();
	let outcome = execute(&service, args.command).await;

	optimizer.abort();

	outcome
}

async fn execute(service: &QuillService, command: Command) -> color_eyre::Result<()> {
	match command {
		Command::Ingest(ingest) => {
			let content = read_input(ingest.file.as_ref())?;
			let response = service
				.add_document(AddDocumentRequest {
					content,
					project_id: ingest.project,
					user_id: ingest.user,
					content_type: ingest.content_type,
					importance: ingest.importance,
				})
				.await?;

			print_json(&response)
		},
		Command::Search(search) => print_json(&service.intelligent_search(search.into_request()).await),
		Command::Sync { project_id } => match service.sync_project_context(&project_id).await {
			Some(profile) => print_json(&profile),
			None => Err(eyre::eyre!("No profile available for project {project_id}.")),
		},
		Command::Stats { project_id } => print_json(&service.get_project_stats(&project_id)),
		Command::Delete { project_id } => print_json(&service.delete_project_documents(&project_id).await),
		Command::CacheStats => {
			let report = service.optimize_cache();

			tracing::debug!(expired = report.expired, evicted = report.evicted, "Cache optimized.");

			print_json(&service.cache_stats())
		},
	}
}

fn read_input(file: Option<&PathBuf>) -> color_eyre::Result<String> {
	match file {
		Some(path) if path.as_os_str() != "-" => Ok(std::fs::read_to_string(path)?),
		_ => {
			let mut raw = String::new();

			io::stdin().read_to_string(&mut raw)?;

			Ok(raw)
		},
	}
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}
