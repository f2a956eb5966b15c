use serde::{Deserialize, Serialize};

use crate::QuillService;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
	pub project_id: String,
	pub removed_chunks: usize,
	pub profile_removed: bool,
}

impl QuillService {
	/// Drops every chunk and the profile of `project_id`. Deleting an unknown project is a no-op.
	pub async fn delete_project_documents(&self, project_id: &str) -> DeleteReport {
		let project_id = project_id.trim().to_string();

		if project_id.is_empty() {
			return DeleteReport { project_id, removed_chunks: 0, profile_removed: false };
		}

		let _guard = self.write_lock.lock().await;
		let removed_chunks = self.index.remove_project(&project_id);
		let profile_removed = self
			.profiles
			.write()
			.unwrap_or_else(|err| err.into_inner())
			.remove(&project_id)
			.is_some();

		self.invalidate_project(Some(&project_id));

		if removed_chunks > 0 || profile_removed {
			self.persist().await;
		}

		tracing::info!(project_id = %project_id, removed_chunks, profile_removed, "Project documents deleted.");

		DeleteReport { project_id, removed_chunks, profile_removed }
	}
}
