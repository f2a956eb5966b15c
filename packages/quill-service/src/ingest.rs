use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_chunking::ChunkingConfig;
use quill_domain::{ContentType, importance};
use quill_storage::{Chunk, ChunkMetadata};

use crate::{ChunkOp, Error, QuillService, Result, profile};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddDocumentRequest {
	pub content: String,
	pub project_id: Option<String>,
	pub user_id: Option<String>,
	/// Overrides the classified content type for every chunk.
	pub content_type: Option<ContentType>,
	/// Overrides the computed importance for every chunk. Clamped to 1-10.
	pub importance: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDocumentResponse {
	pub document_id: Uuid,
	pub project_id: Option<String>,
	pub chunks: Vec<ChunkResult>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
	pub chunk_id: Uuid,
	pub op: ChunkOp,
	pub chunk_index: u32,
}

impl QuillService {
	/// Chunks, enriches, embeds, and indexes a document, then folds its entities into the project
	/// profile. Content without words and non-finite importance are rejected; provider failures
	/// degrade.
	pub async fn add_document(&self, req: AddDocumentRequest) -> Result<AddDocumentResponse> {
		if req.content.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "content must not be empty.".to_string() });
		}
		if let Some(value) = req.importance
			&& !value.is_finite()
		{
			return Err(Error::InvalidRequest { message: "importance must be a finite number.".to_string() });
		}

		let project_id = crate::clean_id(req.project_id.as_deref());
		let user_id = crate::clean_id(req.user_id.as_deref());
		let chunking = ChunkingConfig {
			max_words: self.cfg.chunking.max_words,
			overlap_words: self.cfg.chunking.overlap_words,
		};
		let pieces = quill_chunking::split_text(&req.content, &chunking);

		if pieces.is_empty() {
			return Err(Error::InvalidRequest { message: "content must contain at least one word.".to_string() });
		}

		let total_chunks = pieces.len() as u32;
		let known = project_id.as_deref().and_then(|id| self.profile(id));
		let mut enriched = Vec::with_capacity(pieces.len());

		for piece in &pieces {
			let mut metadata = self.enrich_content(&piece.text, known.as_ref()).await;

			if let Some(content_type) = req.content_type {
				metadata.content_type = content_type;
			}
			if let Some(value) = req.importance {
				metadata.importance = importance::clamp(value);
			}

			enriched.push(metadata);
		}

		let texts: Vec<String> = pieces.iter().map(|piece| piece.text.clone()).collect();
		let vectors: Vec<Option<Vec<f32>>> = match self.embed_texts(&texts).await {
			Ok(vectors) => vectors.into_iter().map(Some).collect(),
			Err(err) => {
				if err.is_degradable() {
					tracing::warn!(
						error = %err,
						chunks = texts.len(),
						"Embedding failed during ingestion. Chunks are indexed for lexical search only."
					);
				} else {
					tracing::error!(
						error = %err,
						chunks = texts.len(),
						"Embedding failed during ingestion. Chunks are indexed for lexical search only."
					);
				}

				vec![None; texts.len()]
			},
		};
		// Provider calls above run unlocked; only index and profile bookkeeping is serialized.
		let _guard = self.write_lock.lock().await;
		let mut vectors = vectors.into_iter();
		let document_id = Uuid::new_v4();
		let now = self.clock.now();
		let mut results = Vec::with_capacity(pieces.len());

		for (piece, metadata) in pieces.into_iter().zip(enriched.iter()) {
			let chunk = Chunk {
				id: Uuid::new_v4(),
				content: piece.text,
				metadata: ChunkMetadata {
					document_id,
					project_id: project_id.clone(),
					user_id: user_id.clone(),
					enrichment: metadata.clone(),
					chunk_index: piece.chunk_index,
					total_chunks,
					created_at: now,
				},
			};
			let (chunk_id, op) = self.index.insert(chunk, vectors.next().flatten());

			tracing::debug!(
				chunk_id = %chunk_id,
				op = ?op,
				project_id = project_id.as_deref().unwrap_or(""),
				"Chunk indexed."
			);

			results.push(ChunkResult { chunk_id, op, chunk_index: piece.chunk_index });
		}

		if let Some(project_id) = project_id.as_deref() {
			let batch: Vec<_> = enriched.iter().map(profile::entities_of).collect();

			self.merge_entities(project_id, &batch);
			self.refresh_style(project_id);
		}

		self.invalidate_project(project_id.as_deref());
		self.persist().await;

		tracing::info!(
			document_id = %document_id,
			project_id = project_id.as_deref().unwrap_or(""),
			chunks = results.len(),
			merged = results.iter().filter(|result| result.op == ChunkOp::Merged).count(),
			"Document ingested."
		);

		Ok(AddDocumentResponse { document_id, project_id, chunks: results })
	}
}
