pub mod cache;
pub mod delete;
pub mod enrich;
pub mod index;
pub mod ingest;
pub mod profile;
pub mod search;
pub mod stats;

mod error;
mod persist;

pub use cache::{Cache, CacheStats, OptimizeReport};
pub use delete::DeleteReport;
pub use error::{Error, Result};
pub use index::ChunkOp;
pub use ingest::{AddDocumentRequest, AddDocumentResponse, ChunkResult};
pub use persist::RehydrateReport;
pub use search::{
	Boost, ProjectInsights, RelatedChunk, SearchExplain, SearchRequest, SearchResponse,
	SearchResult, SearchStrategy, SearchSummary, TimeRange,
};
pub use stats::ProjectStats;

use std::{
	collections::HashMap,
	sync::{Arc, Mutex, RwLock, atomic::AtomicU64},
	time::Duration,
};

use quill_config::Config;
use quill_domain::{Clock, SystemClock};
use quill_providers::Providers;
use quill_storage::{Chunk, ProjectProfile, ProjectStore, SnapshotStore};

use index::ChunkIndex;

/// Collaborators injected into the service.
#[derive(Clone)]
pub struct ServiceParts {
	pub providers: Providers,
	pub project_store: Arc<dyn ProjectStore>,
	pub clock: Arc<dyn Clock>,
}
impl ServiceParts {
	pub fn new(project_store: Arc<dyn ProjectStore>) -> Self {
		Self { providers: Providers::default(), project_store, clock: Arc::new(SystemClock) }
	}

	pub fn with_providers(mut self, providers: Providers) -> Self {
		self.providers = providers;

		self
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}
}

pub struct QuillService {
	pub cfg: Config,
	pub providers: Providers,
	pub cache: Arc<Cache>,
	pub(crate) index: ChunkIndex,
	pub(crate) profiles: RwLock<HashMap<String, ProjectProfile>>,
	pub(crate) project_store: Arc<dyn ProjectStore>,
	pub(crate) snapshots: Arc<SnapshotStore>,
	pub(crate) clock: Arc<dyn Clock>,
	pub(crate) generation: AtomicU64,
	/// Bumped by every cache invalidation. A search stores its response only when the epoch it
	/// started under is still current.
	pub(crate) search_epoch: Mutex<u64>,
	/// Serializes mutations so profile merges and snapshot generations follow ingestion order.
	pub(crate) write_lock: tokio::sync::Mutex<()>,
}
impl QuillService {
	/// Empty service. Use [`QuillService::open`] to restore persisted state.
	pub fn new(cfg: Config, parts: ServiceParts) -> Self {
		let cache = Arc::new(Cache::new(&cfg.cache, parts.clock.clone()));
		let index = ChunkIndex::new(cfg.dedup.jaccard_threshold, cfg.enrichment.max_entities);
		let snapshots = Arc::new(SnapshotStore::new(&cfg.storage));

		Self {
			cfg,
			providers: parts.providers,
			cache,
			index,
			profiles: RwLock::new(HashMap::new()),
			project_store: parts.project_store,
			snapshots,
			clock: parts.clock,
			generation: AtomicU64::new(0),
			search_epoch: Mutex::new(0),
			write_lock: tokio::sync::Mutex::new(()),
		}
	}

	/// Loads the snapshot, re-embeds chunks stored without vectors, and rebuilds missing profiles.
	pub async fn open(cfg: Config, parts: ServiceParts) -> Result<Self> {
		let service = Self::new(cfg, parts);
		let report = service.rehydrate().await?;

		tracing::info!(
			chunks = report.chunks,
			profiles = report.profiles,
			reembedded = report.reembedded,
			rebuilt_profiles = report.rebuilt_profiles,
			"Service state restored."
		);

		Ok(service)
	}

	pub fn chunk_count(&self) -> usize {
		self.index.len()
	}

	/// Indexed chunks in insertion order, optionally limited to one project.
	pub fn chunks(&self, project_id: Option<&str>) -> Vec<Chunk> {
		self.index.candidates(project_id).iter().map(|entry| entry.chunk.clone()).collect()
	}

	/// Every project profile, ordered by project id.
	pub fn profiles(&self) -> Vec<ProjectProfile> {
		let mut profiles: Vec<ProjectProfile> =
			self.profiles.read().unwrap_or_else(|err| err.into_inner()).values().cloned().collect();

		profiles.sort_by(|a, b| a.project_id.cmp(&b.project_id));

		profiles
	}

	pub fn cache_stats(&self) -> CacheStats {
		self.cache.stats()
	}

	pub fn optimize_cache(&self) -> OptimizeReport {
		self.cache.optimize()
	}

	/// Starts the periodic cache optimizer. The task ends once the cache is dropped.
	pub fn spawn_cache_optimizer(&self) -> tokio::task::JoinHandle<()> {
		let interval = Duration::from_secs(self.cfg.cache.optimize_interval_secs.max(1));

		self.cache.spawn_optimizer(interval)
	}

	pub(crate) async fn embed_texts(
		&self,
		texts: &[String],
	) -> quill_providers::Result<Vec<Vec<f32>>> {
		let cfg = &self.cfg.providers.embedding;
		let timeout = Duration::from_millis(cfg.timeout_ms);
		let vectors =
			match tokio::time::timeout(timeout, self.providers.embedding.embed(cfg, texts)).await {
				Ok(result) => result?,
				Err(_) =>
					return Err(quill_providers::Error::Timeout {
						message: format!("Embedding call exceeded {} ms.", cfg.timeout_ms),
					}),
			};

		if vectors.len() != texts.len() {
			return Err(quill_providers::Error::InvalidResponse {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		Ok(vectors)
	}

	pub(crate) fn profile(&self, project_id: &str) -> Option<ProjectProfile> {
		self.profiles.read().unwrap_or_else(|err| err.into_inner()).get(project_id).cloned()
	}

	pub(crate) fn invalidate_project(&self, project_id: Option<&str>) {
		let mut epoch = self.search_epoch.lock().unwrap_or_else(|err| err.into_inner());

		*epoch += 1;

		if let Some(project_id) = project_id {
			self.cache.delete_pattern(&search::cache_prefix(Some(project_id)));
			self.cache.delete(&profile::cache_key(project_id));
		}

		self.cache.delete_pattern(&search::cache_prefix(None));
	}
}

pub(crate) fn clean_id(raw: Option<&str>) -> Option<String> {
	raw.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
