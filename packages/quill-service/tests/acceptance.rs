mod acceptance {
	mod cache_memoization;
	mod delete_project;
	mod enrichment_fallback;
	mod fallback_search;
	mod ingestion;
	mod near_duplicate;
	mod profile_sync;
	mod project_stats;
	mod rerank;
	mod snapshot_roundtrip;
	mod thor_search;

	use std::sync::Arc;

	use quill_config::Config;
	use quill_domain::Clock;
	use quill_providers::{EmbeddingProvider, ExtractorProvider, Providers, RerankProvider};
	use quill_service::{AddDocumentRequest, AddDocumentResponse, QuillService, ServiceParts};
	use quill_testkit::{
		HashEmbedding, ManualClock, MemoryProjectStore, ScriptedExtractor, StaticRerank, TestDir,
	};

	pub struct Harness {
		pub dir: TestDir,
		pub cfg: Config,
		pub clock: Arc<ManualClock>,
		pub store: Arc<MemoryProjectStore>,
		pub embedding: Arc<dyn EmbeddingProvider>,
		pub extractor: Arc<dyn ExtractorProvider>,
		pub rerank: Arc<dyn RerankProvider>,
	}
	impl Harness {
		/// Rule-based enrichment and deterministic hash embeddings.
		pub fn new() -> Self {
			let dir = TestDir::new().expect("Failed to create test dir.");
			let mut cfg = quill_testkit::test_config(dir.path());

			cfg.enrichment.ai_extraction = false;

			Self {
				dir,
				cfg,
				clock: Arc::new(ManualClock::default()),
				store: Arc::new(MemoryProjectStore::default()),
				embedding: Arc::new(HashEmbedding::default()),
				extractor: Arc::new(ScriptedExtractor::default()),
				rerank: Arc::new(StaticRerank::failing()),
			}
		}

		pub fn parts(&self) -> ServiceParts {
			let clock: Arc<dyn Clock> = self.clock.clone();

			ServiceParts::new(self.store.clone())
				.with_providers(Providers::new(
					self.embedding.clone(),
					self.extractor.clone(),
					self.rerank.clone(),
				))
				.with_clock(clock)
		}

		pub async fn open(&self) -> QuillService {
			QuillService::open(self.cfg.clone(), self.parts()).await.expect("Failed to open service.")
		}
	}

	pub async fn add(service: &QuillService, project_id: Option<&str>, content: &str) -> AddDocumentResponse {
		service
			.add_document(AddDocumentRequest {
				content: content.to_string(),
				project_id: project_id.map(str::to_string),
				..Default::default()
			})
			.await
			.expect("Failed to add document.")
	}
}
