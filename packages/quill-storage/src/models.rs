use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use quill_domain::{ContentMetadata, KnownEntities};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
	pub id: Uuid,
	pub content: String,
	pub metadata: ChunkMetadata,
}
impl Chunk {
	pub fn project_id(&self) -> Option<&str> {
		self.metadata.project_id.as_deref()
	}

	pub fn importance(&self) -> f32 {
		self.metadata.enrichment.importance
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
	pub document_id: Uuid,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub project_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(flatten)]
	pub enrichment: ContentMetadata,
	#[serde(default)]
	pub chunk_index: u32,
	#[serde(default = "one")]
	pub total_chunks: u32,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

/// Aggregated entities for one project. Every list is an oldest-first bounded union.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProfile {
	pub project_id: String,
	#[serde(default)]
	pub characters: Vec<String>,
	#[serde(default)]
	pub themes: Vec<String>,
	#[serde(default)]
	pub plot_points: Vec<String>,
	#[serde(default)]
	pub settings: Vec<String>,
	#[serde(default)]
	pub writing_style: String,
	#[serde(default)]
	pub tone_analysis: String,
	#[serde(with = "crate::time_serde")]
	pub last_updated: OffsetDateTime,
}
impl ProjectProfile {
	pub fn new(project_id: impl Into<String>, now: OffsetDateTime) -> Self {
		Self {
			project_id: project_id.into(),
			characters: Vec::new(),
			themes: Vec::new(),
			plot_points: Vec::new(),
			settings: Vec::new(),
			writing_style: String::new(),
			tone_analysis: String::new(),
			last_updated: now,
		}
	}

	pub fn known_entities(&self) -> KnownEntities {
		KnownEntities {
			characters: self.characters.clone(),
			themes: self.themes.clone(),
			settings: self.settings.clone(),
		}
	}

	/// Short description handed to the extractor as context.
	pub fn context_hint(&self) -> String {
		let mut parts = Vec::new();

		if !self.characters.is_empty() {
			parts.push(format!("characters: {}", self.characters.join(", ")));
		}
		if !self.themes.is_empty() {
			parts.push(format!("themes: {}", self.themes.join(", ")));
		}
		if !self.settings.is_empty() {
			parts.push(format!("settings: {}", self.settings.join(", ")));
		}

		parts.join("; ")
	}
}

fn one() -> u32 {
	1
}
