use std::{
	fs,
	path::{Path, PathBuf},
};

use time::OffsetDateTime;

use crate::{BoxFuture, Error, Result};

const EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Source material for a writing project.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectSource {
	pub project_id: String,
	pub title: String,
	pub content: String,
	pub updated_at: OffsetDateTime,
}

/// Read-only access to project source content. Missing projects yield `Error::NotFound`.
pub trait ProjectStore
where
	Self: Send + Sync,
{
	fn get_project<'a>(&'a self, project_id: &'a str) -> BoxFuture<'a, Result<ProjectSource>>;
}

/// Reads `<root>/<project_id>.txt` or `<root>/<project_id>.md`.
pub struct DirProjectStore {
	root: PathBuf,
}
impl DirProjectStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn read(&self, project_id: &str) -> Result<ProjectSource> {
		validate_project_id(project_id)?;

		for ext in EXTENSIONS {
			let path = self.root.join(format!("{project_id}.{ext}"));
			let content = match fs::read_to_string(&path) {
				Ok(content) => content,
				Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
				Err(err) => return Err(err.into()),
			};
			let updated_at = fs::metadata(&path)?
				.modified()
				.map(OffsetDateTime::from)
				.unwrap_or_else(|_| OffsetDateTime::now_utc());

			return Ok(ProjectSource {
				project_id: project_id.to_string(),
				title: title_of(&content).unwrap_or_else(|| project_id.to_string()),
				content,
				updated_at,
			});
		}

		Err(Error::NotFound(format!("Project {project_id} has no source file.")))
	}
}
impl ProjectStore for DirProjectStore {
	fn get_project<'a>(&'a self, project_id: &'a str) -> BoxFuture<'a, Result<ProjectSource>> {
		Box::pin(async move { self.read(project_id) })
	}
}

fn validate_project_id(project_id: &str) -> Result<()> {
	let trimmed = project_id.trim();

	if trimmed.is_empty()
		|| trimmed != project_id
		|| project_id.contains(['/', '\\'])
		|| project_id.starts_with('.')
	{
		return Err(Error::InvalidArgument(format!("Project id {project_id:?} is not a valid file name.")));
	}

	Ok(())
}

fn title_of(content: &str) -> Option<String> {
	content
		.lines()
		.map(|line| line.trim().trim_start_matches('#').trim())
		.find(|line| !line.is_empty())
		.map(str::to_string)
}
