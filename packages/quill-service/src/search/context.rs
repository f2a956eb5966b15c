//! Result-side annotations: summaries, related chunks, and project insights.

use std::{collections::HashMap, sync::Arc};

use quill_domain::{QueryAnalysis, text};
use quill_storage::{Chunk, ProjectProfile};

use super::{ProjectInsights, RelatedChunk, SearchResult, SearchStrategy};
use crate::index::IndexedChunk;

const SAME_DOCUMENT_WEIGHT: usize = 3;
const SHARED_CHARACTER_WEIGHT: usize = 2;
const SHARED_THEME_WEIGHT: usize = 1;
const MAX_SUMMARY_ENTITIES: usize = 3;
const MAX_INSIGHT_ENTRIES: usize = 5;
const MAX_CONNECTIONS: usize = 3;

/// One-line description of what a chunk contains.
pub(super) fn summarize(chunk: &Chunk) -> String {
	let metadata = &chunk.metadata.enrichment;
	let mut summary = format!("{} passage", metadata.content_type);

	if chunk.metadata.total_chunks > 1 {
		summary.push_str(&format!(
			" (part {} of {})",
			chunk.metadata.chunk_index + 1,
			chunk.metadata.total_chunks
		));
	}
	if !metadata.characters.is_empty() {
		summary.push_str(&format!(" featuring {}", head(&metadata.characters)));
	}
	if !metadata.themes.is_empty() {
		summary.push_str(&format!("; themes: {}", head(&metadata.themes)));
	}
	if !metadata.emotions.is_empty() {
		summary.push_str(&format!("; mood: {}", head(&metadata.emotions)));
	}

	summary.push_str(&format!("; importance {:.1}.", metadata.importance));

	summary
}

/// Chunks of the same project that share a document, characters, or themes with `chunk`.
pub(super) fn related(
	chunk: &Chunk,
	pool: &[Arc<IndexedChunk>],
	limit: usize,
	excerpt_chars: usize,
) -> Vec<RelatedChunk> {
	let metadata = &chunk.metadata.enrichment;
	let mut scored: Vec<(usize, f32, RelatedChunk)> = pool
		.iter()
		.map(|entry| &entry.chunk)
		.filter(|other| other.id != chunk.id && other.project_id() == chunk.project_id())
		.filter_map(|other| {
			let same_document = other.metadata.document_id == chunk.metadata.document_id;
			let characters = shared(&metadata.characters, &other.metadata.enrichment.characters);
			let themes = shared(&metadata.themes, &other.metadata.enrichment.themes);
			let weight = usize::from(same_document) * SAME_DOCUMENT_WEIGHT
				+ characters.len() * SHARED_CHARACTER_WEIGHT
				+ themes.len() * SHARED_THEME_WEIGHT;

			if weight == 0 {
				return None;
			}

			let mut relations = Vec::new();

			if same_document {
				relations.push("same document".to_string());
			}
			if !characters.is_empty() {
				relations.push(format!("shared characters: {}", characters.join(", ")));
			}
			if !themes.is_empty() {
				relations.push(format!("shared themes: {}", themes.join(", ")));
			}

			Some((
				weight,
				other.importance(),
				RelatedChunk {
					chunk_id: other.id,
					excerpt: text::excerpt(&other.content, excerpt_chars),
					relation: relations.join("; "),
				},
			))
		})
		.collect();

	scored.sort_by(|a, b| {
		b.0.cmp(&a.0)
			.then_with(|| crate::index::cmp_f32_desc(a.1, b.1))
			.then_with(|| a.2.chunk_id.cmp(&b.2.chunk_id))
	});

	scored.into_iter().take(limit).map(|(_, _, related)| related).collect()
}

/// Aggregates the returned results into a short project overview.
pub(super) fn insights(
	results: &[SearchResult],
	profile: Option<&ProjectProfile>,
	analysis: &QueryAnalysis,
	strategy: SearchStrategy,
) -> ProjectInsights {
	let top_characters =
		top(results.iter().flat_map(|result| &result.chunk.metadata.enrichment.characters));
	let top_themes = top(results.iter().flat_map(|result| &result.chunk.metadata.enrichment.themes));
	let mut hints = Vec::new();

	if strategy == SearchStrategy::Fallback {
		hints.push("Semantic search was unavailable. Results come from keyword matching.".to_string());
	}
	if results.is_empty() {
		hints.push("No passages matched. Try broader terms or fewer filters.".to_string());
	}

	for intent in &analysis.intents {
		if !results.is_empty()
			&& !results.iter().any(|result| result.chunk.metadata.enrichment.content_type == *intent)
		{
			hints.push(format!("No {intent} passages matched this query."));
		}
	}

	if let Some(profile) = profile {
		let untouched: Vec<&String> = profile
			.themes
			.iter()
			.filter(|theme| !top_themes.iter().any(|found| text::fuzzy_match(found, theme)))
			.take(MAX_SUMMARY_ENTITIES)
			.collect();

		if !results.is_empty() && !untouched.is_empty() {
			hints.push(format!(
				"Project themes not covered by these results: {}.",
				untouched.iter().map(|theme| theme.as_str()).collect::<Vec<_>>().join(", ")
			));
		}
	}

	ProjectInsights {
		top_characters,
		top_themes,
		suggested_connections: connections(results),
		hints,
	}
}

/// Character pairs that co-occur in the results, most frequent first.
fn connections(results: &[SearchResult]) -> Vec<String> {
	let mut pairs: HashMap<(String, String), (usize, usize)> = HashMap::new();
	let mut order = 0;

	for result in results {
		let characters = &result.chunk.metadata.enrichment.characters;

		for (position, first) in characters.iter().enumerate() {
			for second in &characters[position + 1..] {
				let key = if first <= second {
					(first.clone(), second.clone())
				} else {
					(second.clone(), first.clone())
				};

				pairs.entry(key).or_insert((0, order)).0 += 1;
				order += 1;
			}
		}
	}

	let mut ranked: Vec<_> = pairs.into_iter().collect();

	ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
	ranked
		.into_iter()
		.take(MAX_CONNECTIONS)
		.map(|((first, second), (count, _))| {
			if count > 1 {
				format!("{first} and {second} appear together in {count} passages.")
			} else {
				format!("{first} and {second} appear together.")
			}
		})
		.collect()
}

fn top<'a, I>(values: I) -> Vec<String>
where
	I: IntoIterator<Item = &'a String>,
{
	let mut counts: HashMap<String, (String, usize, usize)> = HashMap::new();

	for (position, value) in values.into_iter().enumerate() {
		counts.entry(text::normalize(value)).or_insert((value.clone(), 0, position)).1 += 1;
	}

	let mut ranked: Vec<_> = counts.into_values().collect();

	ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
	ranked.into_iter().take(MAX_INSIGHT_ENTRIES).map(|(value, _, _)| value).collect()
}

fn shared(a: &[String], b: &[String]) -> Vec<String> {
	a.iter()
		.filter(|value| b.iter().any(|other| text::normalize(other) == text::normalize(value)))
		.cloned()
		.collect()
}

fn head(values: &[String]) -> String {
	values.iter().take(MAX_SUMMARY_ENTITIES).cloned().collect::<Vec<_>>().join(", ")
}
