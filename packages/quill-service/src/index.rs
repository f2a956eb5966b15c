//! Authoritative chunk collection with semantic and lexical retrieval.

use std::{
	collections::{HashMap, HashSet},
	sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_domain::{ContentMetadata, text};
use quill_storage::{Chunk, SnapshotDocument};

const EXACT_MATCH_SCORE: f32 = 10.0;
const TERM_OCCURRENCE_SCORE: f32 = 3.0;
const CHARACTER_MATCH_SCORE: f32 = 5.0;
const THEME_MATCH_SCORE: f32 = 4.0;
const TAG_MATCH_SCORE: f32 = 2.0;
/// Lexical score that maps to 0.5 when blended into semantic results.
const LEXICAL_SQUASH: f32 = 20.0;

#[derive(Debug)]
pub struct IndexedChunk {
	pub chunk: Chunk,
	pub vector: Option<Vec<f32>>,
	tokens: HashSet<String>,
}
impl IndexedChunk {
	pub fn new(chunk: Chunk, vector: Option<Vec<f32>>) -> Self {
		let tokens = text::token_set(&chunk.content);

		Self { chunk, vector: vector.filter(|vec| !vec.is_empty()), tokens }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkOp {
	Added,
	Merged,
}

#[derive(Clone, Debug)]
pub struct ScoredChunk {
	pub entry: Arc<IndexedChunk>,
	pub score: f32,
	pub matched_terms: Vec<String>,
}

#[derive(Default)]
struct IndexState {
	chunks: Vec<Arc<IndexedChunk>>,
	by_project: HashMap<String, Vec<usize>>,
}
impl IndexState {
	fn rebuild_projects(&mut self) {
		self.by_project.clear();

		for (position, entry) in self.chunks.iter().enumerate() {
			if let Some(project_id) = entry.chunk.project_id() {
				self.by_project.entry(project_id.to_string()).or_default().push(position);
			}
		}
	}

	fn partition(&self, project_id: Option<&str>) -> Vec<usize> {
		match project_id {
			Some(project_id) => self.by_project.get(project_id).cloned().unwrap_or_default(),
			None => self
				.chunks
				.iter()
				.enumerate()
				.filter(|(_, entry)| entry.chunk.project_id().is_none())
				.map(|(position, _)| position)
				.collect(),
		}
	}
}

/// Entries are immutable once published; a merge swaps in a new `Arc`.
pub struct ChunkIndex {
	jaccard_threshold: f32,
	entity_cap: usize,
	state: RwLock<IndexState>,
}
impl ChunkIndex {
	pub fn new(jaccard_threshold: f32, entity_cap: usize) -> Self {
		Self { jaccard_threshold, entity_cap, state: RwLock::new(IndexState::default()) }
	}

	/// Adds the chunk unless a near-duplicate exists in the same project partition, in which case
	/// the duplicate's metadata absorbs the new chunk's metadata.
	pub fn insert(&self, chunk: Chunk, vector: Option<Vec<f32>>) -> (Uuid, ChunkOp) {
		let incoming = IndexedChunk::new(chunk, vector);
		let mut state = self.write();
		let duplicate = state.partition(incoming.chunk.project_id()).into_iter().find(|position| {
			text::jaccard(&state.chunks[*position].tokens, &incoming.tokens) > self.jaccard_threshold
		});

		if let Some(position) = duplicate {
			let existing = &state.chunks[position];
			let merged = merge_entries(existing, &incoming, self.entity_cap);
			let id = merged.chunk.id;

			state.chunks[position] = Arc::new(merged);

			return (id, ChunkOp::Merged);
		}

		let id = incoming.chunk.id;
		let position = state.chunks.len();

		if let Some(project_id) = incoming.chunk.project_id() {
			state.by_project.entry(project_id.to_string()).or_default().push(position);
		}

		state.chunks.push(Arc::new(incoming));

		(id, ChunkOp::Added)
	}

	/// Replaces the whole collection without duplicate checks. Project partitions are derived from
	/// each chunk's own project id.
	pub fn restore(&self, entries: Vec<(Chunk, Option<Vec<f32>>)>) {
		let mut state = self.write();

		state.chunks =
			entries.into_iter().map(|(chunk, vector)| Arc::new(IndexedChunk::new(chunk, vector))).collect();
		state.rebuild_projects();
	}

	pub fn set_vectors(&self, vectors: Vec<(Uuid, Vec<f32>)>) -> usize {
		let by_id: HashMap<Uuid, Vec<f32>> = vectors.into_iter().collect();
		let mut state = self.write();
		let mut updated = 0;

		for entry in state.chunks.iter_mut() {
			if let Some(vector) = by_id.get(&entry.chunk.id) {
				*entry = Arc::new(IndexedChunk::new(entry.chunk.clone(), Some(vector.clone())));
				updated += 1;
			}
		}

		updated
	}

	pub fn remove_project(&self, project_id: &str) -> usize {
		let mut state = self.write();
		let before = state.chunks.len();

		state.chunks.retain(|entry| entry.chunk.project_id() != Some(project_id));
		state.rebuild_projects();

		before - state.chunks.len()
	}

	pub fn len(&self) -> usize {
		self.read().chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn project_len(&self, project_id: &str) -> usize {
		self.read().by_project.get(project_id).map_or(0, Vec::len)
	}

	pub fn project_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.read().by_project.keys().cloned().collect();

		ids.sort();

		ids
	}

	/// Chunks of one project, or every chunk when `project_id` is `None`.
	pub fn candidates(&self, project_id: Option<&str>) -> Vec<Arc<IndexedChunk>> {
		let state = self.read();

		match project_id {
			Some(project_id) => state
				.by_project
				.get(project_id)
				.map(|positions| positions.iter().map(|position| state.chunks[*position].clone()).collect())
				.unwrap_or_default(),
			None => state.chunks.clone(),
		}
	}

	pub fn get(&self, id: Uuid) -> Option<Arc<IndexedChunk>> {
		self.read().chunks.iter().find(|entry| entry.chunk.id == id).cloned()
	}

	pub fn snapshot_documents(&self) -> Vec<SnapshotDocument> {
		self.read()
			.chunks
			.iter()
			.map(|entry| SnapshotDocument::from_chunk(&entry.chunk, entry.vector.as_deref()))
			.collect()
	}

	pub fn missing_vectors(&self) -> Vec<(Uuid, String)> {
		self.read()
			.chunks
			.iter()
			.filter(|entry| entry.vector.is_none())
			.map(|entry| (entry.chunk.id, entry.chunk.content.clone()))
			.collect()
	}

	fn read(&self) -> RwLockReadGuard<'_, IndexState> {
		self.state.read().unwrap_or_else(|err| err.into_inner())
	}

	fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
		self.state.write().unwrap_or_else(|err| err.into_inner())
	}
}

/// Cosine similarity for candidates that carry a vector. Candidates still missing one are scored
/// lexically, squashed into the 0-1 range so they compete with cosine scores.
pub fn semantic_search(
	candidates: &[Arc<IndexedChunk>],
	query_vector: &[f32],
	query: &str,
	limit: usize,
) -> Vec<ScoredChunk> {
	let normalized_query = text::normalize(query.trim());
	let terms = text::query_terms(query);
	let mut scored: Vec<ScoredChunk> = candidates
		.iter()
		.filter_map(|entry| match entry.vector.as_deref() {
			Some(vector) => {
				let score = cosine(query_vector, vector)?;

				Some(ScoredChunk { entry: entry.clone(), score, matched_terms: Vec::new() })
			},
			None => {
				let (score, matched_terms) = lexical_score(&entry.chunk, &normalized_query, &terms);

				(score > 0.0).then(|| ScoredChunk {
					entry: entry.clone(),
					score: score / (score + LEXICAL_SQUASH),
					matched_terms,
				})
			},
		})
		.collect();

	sort_desc(&mut scored);
	scored.truncate(limit);

	scored
}

/// Term-frequency scoring used when the embedding backend is unavailable.
pub fn lexical_search(
	candidates: &[Arc<IndexedChunk>],
	query: &str,
	limit: usize,
) -> Vec<ScoredChunk> {
	let normalized_query = text::normalize(query.trim());
	let terms = text::query_terms(query);
	let mut scored: Vec<ScoredChunk> = candidates
		.iter()
		.filter_map(|entry| {
			let (score, matched_terms) = lexical_score(&entry.chunk, &normalized_query, &terms);

			(score > 0.0).then(|| ScoredChunk { entry: entry.clone(), score, matched_terms })
		})
		.collect();

	sort_desc(&mut scored);
	scored.truncate(limit);

	scored
}

pub fn lexical_score(chunk: &Chunk, normalized_query: &str, terms: &[String]) -> (f32, Vec<String>) {
	let content = text::normalize(&chunk.content);
	let metadata = &chunk.metadata.enrichment;
	let mut score = 0.0;
	let mut matched = Vec::new();

	if !normalized_query.is_empty() && content.contains(normalized_query) {
		score += EXACT_MATCH_SCORE;
	}

	for term in terms {
		let occurrences = text::count_occurrences(&content, term);
		let mut hit = occurrences > 0;

		score += TERM_OCCURRENCE_SCORE * occurrences as f32;

		if entity_matches(&metadata.characters, term) {
			score += CHARACTER_MATCH_SCORE;
			hit = true;
		}
		if entity_matches(&metadata.themes, term) {
			score += THEME_MATCH_SCORE;
			hit = true;
		}
		if entity_matches(&metadata.semantic_tags, term) {
			score += TAG_MATCH_SCORE;
			hit = true;
		}
		if hit {
			matched.push(term.clone());
		}
	}

	// Importance only lifts chunks that matched something.
	if score > 0.0 {
		score += metadata.importance;
	}

	(score, matched)
}

pub fn cosine(a: &[f32], b: &[f32]) -> Option<f32> {
	if a.len() != b.len() || a.is_empty() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return None;
	}

	Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

pub fn cmp_f32_desc(a: f32, b: f32) -> std::cmp::Ordering {
	b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}

fn sort_desc(scored: &mut [ScoredChunk]) {
	scored.sort_by(|a, b| cmp_f32_desc(a.score, b.score));
}

fn entity_matches(entities: &[String], term: &str) -> bool {
	entities.iter().any(|entity| text::tokenize(entity).iter().any(|token| token == term))
}

fn merge_entries(existing: &IndexedChunk, incoming: &IndexedChunk, cap: usize) -> IndexedChunk {
	let mut chunk = existing.chunk.clone();

	merge_metadata(&mut chunk.metadata.enrichment, &incoming.chunk.metadata.enrichment, cap);

	if chunk.metadata.user_id.is_none() {
		chunk.metadata.user_id = incoming.chunk.metadata.user_id.clone();
	}

	let vector = existing.vector.clone().or_else(|| incoming.vector.clone());

	IndexedChunk { chunk, vector, tokens: existing.tokens.clone() }
}

fn merge_metadata(target: &mut ContentMetadata, incoming: &ContentMetadata, cap: usize) {
	text::bounded_union(&mut target.characters, &incoming.characters, cap);
	text::bounded_union(&mut target.themes, &incoming.themes, cap);
	text::bounded_union(&mut target.emotions, &incoming.emotions, cap);
	text::bounded_union(&mut target.plot_elements, &incoming.plot_elements, cap);
	text::bounded_union(&mut target.semantic_tags, &incoming.semantic_tags, cap);
	text::bounded_union(&mut target.settings, &incoming.settings, cap);

	target.importance = target.importance.max(incoming.importance);
}
