use std::{cmp::Ordering, sync::Arc};

use quill_domain::{QueryAnalysis, importance::NEUTRAL_IMPORTANCE, text};
use quill_storage::Chunk;

use super::Boost;
use crate::index::{IndexedChunk, ScoredChunk, cmp_f32_desc};

pub(super) struct RankContext<'a> {
	analysis: &'a QueryAnalysis,
	query_tokens: Vec<String>,
	project_id: Option<&'a str>,
	cfg: &'a quill_config::Ranking,
}
impl<'a> RankContext<'a> {
	pub(super) fn new(
		query: &str,
		analysis: &'a QueryAnalysis,
		project_id: Option<&'a str>,
		cfg: &'a quill_config::Ranking,
	) -> Self {
		Self { analysis, query_tokens: text::tokenize(query), project_id, cfg }
	}

	fn theme_mentioned(&self, theme: &str) -> bool {
		self.analysis.themes.iter().any(|wanted| text::fuzzy_match(wanted, theme))
			|| mentions(&self.query_tokens, theme)
	}

	fn character_mentioned(&self, name: &str) -> bool {
		self.analysis.characters.iter().any(|wanted| text::fuzzy_match(wanted, name))
			|| mentions(&self.query_tokens, name)
	}
}

#[derive(Clone, Debug)]
pub(super) struct RankedChunk {
	pub(super) entry: Arc<IndexedChunk>,
	pub(super) base_score: f32,
	pub(super) final_score: f32,
	pub(super) boosts: Vec<Boost>,
	pub(super) matched_terms: Vec<String>,
}
impl RankedChunk {
	/// Multiplies the score. Neutral factors are not recorded.
	pub(super) fn apply(&mut self, name: &str, factor: f32) {
		if !factor.is_finite() || (factor - 1.0).abs() < f32::EPSILON {
			return;
		}

		let factor = factor.max(0.0);

		self.final_score *= factor;
		self.boosts.push(Boost { name: name.to_string(), factor });
	}
}

/// Applies the composite boosts and sorts best first.
pub(super) fn rank(scored: Vec<ScoredChunk>, ctx: &RankContext<'_>, semantic: bool) -> Vec<RankedChunk> {
	let mut ranked: Vec<RankedChunk> = scored
		.into_iter()
		.map(|scored| {
			let base_score = if semantic { scored.score.max(0.0) } else { scored.score };
			let matched_terms = if scored.matched_terms.is_empty() {
				matched_terms(&scored.entry.chunk, ctx)
			} else {
				scored.matched_terms
			};
			let mut item = RankedChunk {
				entry: scored.entry,
				base_score,
				final_score: base_score,
				boosts: Vec::new(),
				matched_terms,
			};

			apply_boosts(&mut item, ctx);

			item
		})
		.collect();

	sort(&mut ranked);

	ranked
}

pub(super) fn sort(ranked: &mut [RankedChunk]) {
	ranked.sort_by(|a, b| {
		cmp_f32_desc(a.final_score, b.final_score)
			.then_with(|| cmp_f32_desc(a.entry.chunk.importance(), b.entry.chunk.importance()))
			.then_with(|| cmp_created(&a.entry.chunk, &b.entry.chunk))
	});
}

fn apply_boosts(item: &mut RankedChunk, ctx: &RankContext<'_>) {
	let cfg = ctx.cfg;
	let entry = item.entry.clone();
	let chunk = &entry.chunk;
	let metadata = &chunk.metadata.enrichment;

	if let Some(project_id) = ctx.project_id
		&& chunk.project_id() == Some(project_id)
	{
		item.apply("project", cfg.project_boost);
	}

	let themes = metadata.themes.iter().filter(|theme| ctx.theme_mentioned(theme)).count();
	let characters = metadata.characters.iter().filter(|name| ctx.character_mentioned(name)).count();

	item.apply("theme", 1.0 + cfg.theme_weight * themes as f32);
	item.apply("character", 1.0 + cfg.character_weight * characters as f32);
	item.apply("importance", 1.0 + cfg.importance_weight * (metadata.importance - NEUTRAL_IMPORTANCE));

	if ctx.analysis.intents.contains(&metadata.content_type) {
		item.apply("content_type", cfg.content_type_boost);
	}
}

fn matched_terms(chunk: &Chunk, ctx: &RankContext<'_>) -> Vec<String> {
	let content = text::normalize(&chunk.content);

	ctx.analysis.terms.iter().filter(|term| content.contains(term.as_str())).cloned().collect()
}

fn mentions(tokens: &[String], value: &str) -> bool {
	let words = text::tokenize(value);

	!words.is_empty() && words.iter().all(|word| tokens.contains(word))
}

fn cmp_created(a: &Chunk, b: &Chunk) -> Ordering {
	b.metadata.created_at.cmp(&a.metadata.created_at).then_with(|| a.id.cmp(&b.id))
}
