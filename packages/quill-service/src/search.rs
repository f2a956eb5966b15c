mod context;
mod filter;
mod ranking;

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::time::Instant;
use uuid::Uuid;

use quill_domain::{ContentType, QueryAnalysis, query};
use quill_storage::Chunk;

use crate::{
	QuillService, cache,
	index::{self, IndexedChunk, ScoredChunk},
};
use filter::SearchFilter;
use ranking::{RankContext, RankedChunk};

const CACHE_NAMESPACE: &str = "search";
const UNSCOPED: &str = "*";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
	pub query: String,
	pub project_id: Option<String>,
	pub user_id: Option<String>,
	pub content_types: Vec<ContentType>,
	pub themes: Vec<String>,
	pub characters: Vec<String>,
	pub min_importance: Option<f32>,
	pub time_range: Option<TimeRange>,
	pub limit: Option<u32>,
	/// Related-chunk cross references. Defaults to on.
	pub include_context: Option<bool>,
	/// Project insights. Defaults to on when a project is given.
	pub include_insights: Option<bool>,
}

/// Inclusive creation-time window. Either bound may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeRange {
	#[serde(with = "quill_storage::time_serde::option")]
	pub start: Option<OffsetDateTime>,
	#[serde(with = "quill_storage::time_serde::option")]
	pub end: Option<OffsetDateTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
	Semantic,
	Fallback,
	Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub results: Vec<SearchResult>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub insights: Option<ProjectInsights>,
	pub search_summary: SearchSummary,
	pub query_analysis: QueryAnalysis,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
	pub chunk: Chunk,
	pub score: f32,
	pub summary: String,
	pub related_chunks: Vec<RelatedChunk>,
	pub explain: SearchExplain,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedChunk {
	pub chunk_id: Uuid,
	pub excerpt: String,
	pub relation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchExplain {
	pub base_score: f32,
	pub final_score: f32,
	pub boosts: Vec<Boost>,
	pub matched_terms: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boost {
	pub name: String,
	pub factor: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
	pub search_strategy: SearchStrategy,
	pub candidate_count: usize,
	pub filtered_count: usize,
	pub returned_count: usize,
	pub cached: bool,
	pub took_ms: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInsights {
	pub top_characters: Vec<String>,
	pub top_themes: Vec<String>,
	pub suggested_connections: Vec<String>,
	pub hints: Vec<String>,
}

/// Prefix shared by every cached search scoped to `project_id`.
pub(crate) fn cache_prefix(project_id: Option<&str>) -> String {
	format!("{CACHE_NAMESPACE}:{}:", project_id.unwrap_or(UNSCOPED))
}

impl QuillService {
	/// Ranked, filtered, context-enriched search. Never fails: backend trouble degrades to lexical
	/// scoring or, for unclassified errors, to an empty `failed` response.
	pub async fn intelligent_search(&self, req: SearchRequest) -> SearchResponse {
		let started = Instant::now();
		let project_id = crate::clean_id(req.project_id.as_deref());
		let limit = req.limit.unwrap_or(self.cfg.search.default_limit).min(self.cfg.search.max_limit)
			as usize;
		let key = search_cache_key(&req, project_id.as_deref(), limit);

		if let Some(mut cached) = self.cache.get::<SearchResponse>(&key) {
			cached.search_summary.cached = true;
			cached.search_summary.took_ms = elapsed_ms(started);

			return cached;
		}

		let epoch = self.current_search_epoch();
		let profile = project_id.as_deref().and_then(|id| self.profile(id));
		let known = profile.as_ref().map(|profile| profile.known_entities()).unwrap_or_default();
		let analysis = query::analyze(&req.query, &known);
		let candidates = self.index.candidates(project_id.as_deref());
		let fetch = limit.saturating_mul(self.cfg.search.overfetch_factor.max(1) as usize);
		let (strategy, scored) =
			self.retrieve(&req.query, project_id.as_deref(), &candidates, fetch).await;

		if strategy == SearchStrategy::Failed {
			return SearchResponse {
				results: Vec::new(),
				insights: None,
				search_summary: SearchSummary {
					search_strategy: strategy,
					candidate_count: candidates.len(),
					filtered_count: 0,
					returned_count: 0,
					cached: false,
					took_ms: elapsed_ms(started),
				},
				query_analysis: analysis,
			};
		}

		let filter = SearchFilter::new(&req, project_id.as_deref());
		let retrieved = scored.len();
		let filtered: Vec<ScoredChunk> =
			scored.into_iter().filter(|scored| filter.matches(&scored.entry.chunk)).collect();
		let filtered_count = filtered.len();
		let rank_ctx = RankContext::new(&req.query, &analysis, project_id.as_deref(), &self.cfg.ranking);
		let mut ranked = ranking::rank(filtered, &rank_ctx, strategy == SearchStrategy::Semantic);

		if self.cfg.ranking.rerank.enabled {
			self.rerank(&req.query, &mut ranked).await;
		}

		ranked.truncate(limit);

		let results = self.build_results(ranked, req.include_context.unwrap_or(true));
		let insights = match project_id.as_deref() {
			Some(_) if req.include_insights.unwrap_or(true) =>
				Some(context::insights(&results, profile.as_ref(), &analysis, strategy)),
			_ => None,
		};
		let response = SearchResponse {
			search_summary: SearchSummary {
				search_strategy: strategy,
				candidate_count: candidates.len(),
				filtered_count,
				returned_count: results.len(),
				cached: false,
				took_ms: elapsed_ms(started),
			},
			results,
			insights,
			query_analysis: analysis,
		};

		tracing::debug!(
			project_id = project_id.as_deref().unwrap_or(""),
			strategy = ?strategy,
			retrieved,
			filtered = filtered_count,
			returned = response.results.len(),
			"Search completed."
		);

		self.cache_search(&key, &response, epoch);

		response
	}

	fn current_search_epoch(&self) -> u64 {
		*self.search_epoch.lock().unwrap_or_else(|err| err.into_inner())
	}

	/// Holding the epoch lock across the write keeps an invalidation from slipping in between the
	/// check and the insert.
	fn cache_search(&self, key: &str, response: &SearchResponse, epoch: u64) {
		let current = self.search_epoch.lock().unwrap_or_else(|err| err.into_inner());

		if *current != epoch {
			tracing::debug!(
				started_epoch = epoch,
				current_epoch = *current,
				"Index changed during search. Response not cached."
			);

			return;
		}

		self.cache.set(key, response, Duration::from_secs(self.cfg.cache.search_ttl_secs));
	}

	async fn retrieve(
		&self,
		query: &str,
		project_id: Option<&str>,
		candidates: &[Arc<IndexedChunk>],
		fetch: usize,
	) -> (SearchStrategy, Vec<ScoredChunk>) {
		if query.trim().is_empty() || candidates.is_empty() {
			return (SearchStrategy::Semantic, Vec::new());
		}

		match self.embed_texts(&[query.to_string()]).await {
			Ok(vectors) => {
				let Some(vector) = vectors.first() else {
					return (SearchStrategy::Semantic, Vec::new());
				};
				let missing: Vec<_> = candidates
					.iter()
					.filter(|entry| entry.vector.is_none())
					.map(|entry| (entry.chunk.id, entry.chunk.content.clone()))
					.collect();

				// Chunks ingested while the backend was down get their vectors on first use.
				if !missing.is_empty() && self.embed_missing(&missing).await > 0 {
					let refreshed = self.index.candidates(project_id);

					return (
						SearchStrategy::Semantic,
						index::semantic_search(&refreshed, vector, query, fetch),
					);
				}

				(SearchStrategy::Semantic, index::semantic_search(candidates, vector, query, fetch))
			},
			Err(err) if err.is_degradable() => {
				tracing::warn!(
					error = %err,
					kind = err.kind(),
					"Semantic search unavailable. Falling back to lexical search."
				);

				(SearchStrategy::Fallback, index::lexical_search(candidates, query, fetch))
			},
			Err(err) => {
				tracing::error!(error = %err, kind = err.kind(), "Semantic search failed.");

				(SearchStrategy::Failed, Vec::new())
			},
		}
	}

	async fn rerank(&self, query: &str, ranked: &mut [RankedChunk]) {
		let take = ranked.len().min(self.cfg.ranking.rerank.max_candidates as usize);

		if take == 0 {
			return;
		}

		let cfg = &self.cfg.providers.rerank;
		let docs: Vec<String> =
			ranked[..take].iter().map(|item| item.entry.chunk.content.clone()).collect();
		let call = self.providers.rerank.rerank(cfg, query, &docs);
		let scores = match tokio::time::timeout(Duration::from_millis(cfg.timeout_ms), call).await {
			Ok(Ok(scores)) if scores.len() == take => scores,
			Ok(Ok(scores)) => {
				tracing::warn!(
					expected = take,
					received = scores.len(),
					"Rerank returned a mismatched score count. Keeping deterministic order."
				);

				return;
			},
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Rerank failed. Keeping deterministic order.");

				return;
			},
			Err(_) => {
				tracing::warn!(timeout_ms = cfg.timeout_ms, "Rerank timed out. Keeping deterministic order.");

				return;
			},
		};
		let weight = self.cfg.ranking.rerank.weight;

		for (item, score) in ranked[..take].iter_mut().zip(scores) {
			let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };

			item.apply("rerank", 1.0 + weight * score);
		}

		ranking::sort(&mut ranked[..take]);
	}

	fn build_results(&self, ranked: Vec<RankedChunk>, include_context: bool) -> Vec<SearchResult> {
		let search = &self.cfg.search;
		let mut pools: std::collections::HashMap<Option<String>, Vec<Arc<IndexedChunk>>> =
			std::collections::HashMap::new();

		ranked
			.into_iter()
			.map(|item| {
				let chunk = &item.entry.chunk;
				let related_chunks = if include_context && search.related_chunks > 0 {
					let pool = pools
						.entry(chunk.metadata.project_id.clone())
						.or_insert_with(|| self.index.candidates(chunk.project_id()));

					context::related(chunk, pool, search.related_chunks, search.excerpt_chars)
				} else {
					Vec::new()
				};

				SearchResult {
					chunk: chunk.clone(),
					score: item.final_score,
					summary: context::summarize(chunk),
					related_chunks,
					explain: SearchExplain {
						base_score: item.base_score,
						final_score: item.final_score,
						boosts: item.boosts,
						matched_terms: item.matched_terms,
					},
				}
			})
			.collect()
	}
}

fn search_cache_key(req: &SearchRequest, project_id: Option<&str>, limit: usize) -> String {
	let payload = serde_json::json!({
		"query": req.query.trim(),
		"user_id": req.user_id,
		"content_types": req.content_types,
		"themes": req.themes,
		"characters": req.characters,
		"min_importance": req.min_importance,
		"time_range": req.time_range,
		"limit": limit,
		"include_context": req.include_context,
		"include_insights": req.include_insights,
	});

	cache::hash_cache_key(
		&format!("{CACHE_NAMESPACE}:{}", project_id.unwrap_or(UNSCOPED)),
		&payload,
	)
}

fn elapsed_ms(started: Instant) -> u64 {
	started.elapsed().as_millis().min(u64::MAX as u128) as u64
}
