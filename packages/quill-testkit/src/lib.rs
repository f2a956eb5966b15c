mod error;

pub use error::{Error, Result};

use std::{
	collections::{HashMap, VecDeque},
	env, fs,
	path::{Path, PathBuf},
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Map;
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

use quill_config::{
	Cache, Chunking, Config, Dedup, EmbeddingProviderConfig, Enrichment, LlmProviderConfig,
	ProviderConfig, Profiles, Providers, Ranking, Search, Service, Storage,
};
use quill_domain::{Clock, ExtractedEntities};
use quill_providers::{BoxFuture, EmbeddingProvider, ExtractorProvider, RerankProvider};
use quill_storage::{ProjectSource, ProjectStore};

pub const TEST_DIMENSIONS: u32 = 64;

/// Unique directory under the system temp dir, removed on drop.
pub struct TestDir {
	path: PathBuf,
}
impl TestDir {
	pub fn new() -> Result<Self> {
		let path = env::temp_dir().join(format!("quill_test_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&path)?;

		Ok(Self { path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn join(&self, name: &str) -> PathBuf {
		self.path.join(name)
	}

	pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
		let target = self.join(name);

		fs::write(&target, contents)?;

		Ok(target)
	}
}
impl Drop for TestDir {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.path);
	}
}

/// Clock that only moves when told to.
pub struct ManualClock {
	now: Mutex<OffsetDateTime>,
}
impl ManualClock {
	pub fn new(start: OffsetDateTime) -> Self {
		Self { now: Mutex::new(start) }
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());

		*now += by;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(datetime!(2026-01-01 00:00 UTC))
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.now.lock().unwrap_or_else(|err| err.into_inner())
	}
}

/// Deterministic bag-of-words vectors: texts sharing words end up close.
#[derive(Default)]
pub struct HashEmbedding {
	calls: AtomicUsize,
}
impl HashEmbedding {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn vector(text: &str, dimensions: u32) -> Vec<f32> {
		let dims = dimensions.max(1) as usize;
		let mut vec = vec![0.0_f32; dims];

		for token in quill_domain::text::tokenize(text) {
			let hash = blake3::hash(token.as_bytes());
			let bytes = hash.as_bytes();
			let slot = u64::from_le_bytes([
				bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
			]) as usize % dims;
			let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

			vec[slot] += sign;
		}

		let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

		if norm > 0.0 {
			vec.iter_mut().for_each(|value| *value /= norm);
		}

		vec
	}
}
impl EmbeddingProvider for HashEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, quill_providers::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors = texts.iter().map(|text| Self::vector(text, cfg.dimensions)).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
	RateLimited,
	Unavailable,
	Timeout,
	InvalidResponse,
}
impl FailureKind {
	pub fn to_error(self) -> quill_providers::Error {
		let message = "Scripted failure.".to_string();

		match self {
			Self::RateLimited => quill_providers::Error::RateLimited { message },
			Self::Unavailable => quill_providers::Error::Unavailable { message },
			Self::Timeout => quill_providers::Error::Timeout { message },
			Self::InvalidResponse => quill_providers::Error::InvalidResponse { message },
		}
	}
}

/// Fails the first `remaining` calls, then behaves like [`HashEmbedding`].
pub struct FailingEmbedding {
	kind: FailureKind,
	remaining: AtomicUsize,
	inner: HashEmbedding,
}
impl FailingEmbedding {
	pub fn always(kind: FailureKind) -> Self {
		Self::times(kind, usize::MAX)
	}

	pub fn times(kind: FailureKind, count: usize) -> Self {
		Self { kind, remaining: AtomicUsize::new(count), inner: HashEmbedding::default() }
	}
}
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, quill_providers::Result<Vec<Vec<f32>>>> {
		let failed = self
			.remaining
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok();

		if failed {
			let err = self.kind.to_error();

			return Box::pin(async move { Err(err) });
		}

		self.inner.embed(cfg, texts)
	}
}

/// [`HashEmbedding`] that sleeps before answering calls where any input matches `predicate`.
pub struct DelayedEmbedding {
	delay: Duration,
	predicate: Box<dyn Fn(&str) -> bool + Send + Sync>,
	inner: HashEmbedding,
}
impl DelayedEmbedding {
	pub fn when<F>(delay: Duration, predicate: F) -> Self
	where
		F: Fn(&str) -> bool + Send + Sync + 'static,
	{
		Self { delay, predicate: Box::new(predicate), inner: HashEmbedding::default() }
	}

	pub fn calls(&self) -> usize {
		self.inner.calls()
	}
}
impl EmbeddingProvider for DelayedEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, quill_providers::Result<Vec<Vec<f32>>>> {
		let delay = texts.iter().any(|text| (self.predicate)(text)).then_some(self.delay);

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			self.inner.embed(cfg, texts).await
		})
	}
}

#[derive(Clone, Debug)]
pub enum ExtractorStep {
	Entities(ExtractedEntities),
	/// Non-JSON model output, surfaced as `MalformedResponse`.
	Malformed(String),
	Fail(FailureKind),
	/// Sleeps before answering with empty entities.
	Hang(Duration),
}

/// Replays steps in order; an exhausted script reports the provider as unavailable.
#[derive(Default)]
pub struct ScriptedExtractor {
	steps: Mutex<VecDeque<ExtractorStep>>,
	calls: AtomicUsize,
}
impl ScriptedExtractor {
	pub fn new(steps: impl IntoIterator<Item = ExtractorStep>) -> Self {
		Self { steps: Mutex::new(steps.into_iter().collect()), calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl ExtractorProvider for ScriptedExtractor {
	fn extract<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_text: &'a str,
		_context_hint: &'a str,
	) -> BoxFuture<'a, quill_providers::Result<ExtractedEntities>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let step = self.steps.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

		Box::pin(async move {
			match step {
				Some(ExtractorStep::Entities(entities)) => Ok(entities),
				Some(ExtractorStep::Malformed(raw)) => Err(quill_providers::Error::MalformedResponse {
					message: "Scripted malformed output.".to_string(),
					raw,
				}),
				Some(ExtractorStep::Fail(kind)) => Err(kind.to_error()),
				Some(ExtractorStep::Hang(duration)) => {
					tokio::time::sleep(duration).await;

					Ok(ExtractedEntities::default())
				},
				None => Err(FailureKind::Unavailable.to_error()),
			}
		})
	}
}

/// Scores 1.0 for documents containing `term`, 0.0 otherwise.
pub struct StaticRerank {
	term: Option<String>,
}
impl StaticRerank {
	pub fn favoring(term: &str) -> Self {
		Self { term: Some(term.to_lowercase()) }
	}

	pub fn failing() -> Self {
		Self { term: None }
	}
}
impl RerankProvider for StaticRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, quill_providers::Result<Vec<f32>>> {
		let result = match self.term.as_deref() {
			Some(term) => Ok(docs
				.iter()
				.map(|doc| if doc.to_lowercase().contains(term) { 1.0 } else { 0.0 })
				.collect()),
			None => Err(FailureKind::Unavailable.to_error()),
		};

		Box::pin(async move { result })
	}
}

#[derive(Default)]
pub struct MemoryProjectStore {
	projects: Mutex<HashMap<String, ProjectSource>>,
	reads: AtomicUsize,
}
impl MemoryProjectStore {
	pub fn insert(&self, project_id: &str, content: &str) {
		let source = ProjectSource {
			project_id: project_id.to_string(),
			title: project_id.to_string(),
			content: content.to_string(),
			updated_at: datetime!(2026-01-01 00:00 UTC),
		};

		self.projects.lock().unwrap_or_else(|err| err.into_inner()).insert(project_id.to_string(), source);
	}

	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}
}
impl ProjectStore for MemoryProjectStore {
	fn get_project<'a>(
		&'a self,
		project_id: &'a str,
	) -> BoxFuture<'a, quill_storage::Result<ProjectSource>> {
		self.reads.fetch_add(1, Ordering::SeqCst);

		let found = self.projects.lock().unwrap_or_else(|err| err.into_inner()).get(project_id).cloned();

		Box::pin(async move {
			found.ok_or_else(|| quill_storage::Error::NotFound(format!("Project {project_id} not found.")))
		})
	}
}

/// Valid configuration rooted at `dir`, with fake provider endpoints.
pub fn test_config(dir: &Path) -> Config {
	Config {
		service: Service { log_level: "debug".to_string() },
		storage: Storage {
			snapshot_path: dir.join("quill.json"),
			backup_dir: None,
			max_backups: 3,
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "hash".to_string(),
				dimensions: TEST_DIMENSIONS,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm_extractor: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/chat/completions".to_string(),
				model: "scripted".to_string(),
				temperature: 0.0,
				timeout_ms: 200,
				default_headers: Map::new(),
			},
			rerank: ProviderConfig::default(),
		},
		cache: Cache::default(),
		enrichment: Enrichment::default(),
		chunking: Chunking::default(),
		dedup: Dedup::default(),
		search: Search::default(),
		ranking: Ranking::default(),
		profiles: Profiles::default(),
	}
}
