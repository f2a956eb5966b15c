use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{Chunk, ChunkMetadata, ProjectProfile},
};

/// Version 1 snapshots carry no project contexts and no stored vectors.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
	pub documents: Vec<SnapshotDocument>,
	#[serde(default)]
	pub project_contexts: BTreeMap<String, ProjectProfile>,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	#[serde(default = "legacy_version")]
	pub version: u32,
}
impl Snapshot {
	pub fn new(
		documents: Vec<SnapshotDocument>,
		project_contexts: BTreeMap<String, ProjectProfile>,
		timestamp: OffsetDateTime,
	) -> Self {
		Self { documents, project_contexts, timestamp, version: SNAPSHOT_VERSION }
	}

	pub fn ensure_supported(&self) -> Result<()> {
		if self.version > SNAPSHOT_VERSION {
			return Err(Error::UnsupportedVersion {
				found: self.version,
				supported: SNAPSHOT_VERSION,
			});
		}

		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
	#[serde(default = "Uuid::new_v4")]
	pub id: Uuid,
	pub content: String,
	pub metadata: ChunkMetadata,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub embedding: Option<Vec<f32>>,
}
impl SnapshotDocument {
	pub fn from_chunk(chunk: &Chunk, embedding: Option<&[f32]>) -> Self {
		Self {
			id: chunk.id,
			content: chunk.content.clone(),
			metadata: chunk.metadata.clone(),
			embedding: embedding.filter(|vec| !vec.is_empty()).map(<[f32]>::to_vec),
		}
	}

	pub fn into_parts(self) -> (Chunk, Option<Vec<f32>>) {
		(Chunk { id: self.id, content: self.content, metadata: self.metadata }, self.embedding)
	}
}

fn legacy_version() -> u32 {
	1
}
