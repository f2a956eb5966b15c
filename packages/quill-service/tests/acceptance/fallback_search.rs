use std::sync::Arc;

use quill_service::{SearchRequest, SearchStrategy};
use quill_testkit::{FailingEmbedding, FailureKind};

use super::Harness;

fn harness_failing_with(kind: FailureKind) -> Harness {
	let mut harness = Harness::new();

	harness.embedding = Arc::new(FailingEmbedding::always(kind));

	harness
}

async fn seed(service: &quill_service::QuillService) {
	super::add(service, None, "Norse mythology shapes every chapter of the saga.").await;
	super::add(service, None, "The gods and giants of mythology quarrel over a golden ring.").await;
	super::add(service, None, "A quiet kitchen scene with bread and tea.").await;
}

#[tokio::test]
async fn rate_limited_backend_falls_back_to_lexical_search() {
	let harness = harness_failing_with(FailureKind::RateLimited);
	let service = harness.open().await;

	seed(&service).await;

	let response = service
		.intelligent_search(SearchRequest { query: "mythology".to_string(), ..Default::default() })
		.await;

	assert_eq!(response.search_summary.search_strategy, SearchStrategy::Fallback);
	assert_eq!(response.results.len(), 2);
	assert!(response.results.iter().all(|result| result.chunk.content.contains("mythology")));
	assert!(response.results[0].score >= response.results[1].score);
	assert!(response.results[0].explain.matched_terms.contains(&"mythology".to_string()));
}

#[tokio::test]
async fn timeouts_and_unavailable_backends_also_fall_back() {
	for kind in [FailureKind::Timeout, FailureKind::Unavailable] {
		let harness = harness_failing_with(kind);
		let service = harness.open().await;

		seed(&service).await;

		let response = service
			.intelligent_search(SearchRequest { query: "mythology".to_string(), ..Default::default() })
			.await;

		assert_eq!(response.search_summary.search_strategy, SearchStrategy::Fallback, "{kind:?}");
		assert!(!response.results.is_empty(), "{kind:?}");
	}
}

#[tokio::test]
async fn unclassified_errors_return_an_empty_failed_response() {
	let harness = harness_failing_with(FailureKind::InvalidResponse);
	let service = harness.open().await;

	seed(&service).await;

	let request = SearchRequest { query: "mythology".to_string(), ..Default::default() };
	let response = service.intelligent_search(request.clone()).await;

	assert_eq!(response.search_summary.search_strategy, SearchStrategy::Failed);
	assert!(response.results.is_empty());

	// Failures are not cached.
	let again = service.intelligent_search(request).await;

	assert!(!again.search_summary.cached);
}

#[tokio::test]
async fn chunks_ingested_during_an_outage_are_embedded_on_first_search() {
	let mut harness = Harness::new();

	harness.embedding = Arc::new(FailingEmbedding::times(FailureKind::RateLimited, 1));

	let service = harness.open().await;

	// The single failure is consumed by the first ingestion, which stores no vector.
	super::add(&service, None, "Norse mythology shapes every chapter of the saga.").await;
	super::add(&service, None, "The gods and giants of mythology quarrel over a golden ring.").await;

	let request = SearchRequest { query: "mythology".to_string(), ..Default::default() };
	let response = service.intelligent_search(request.clone()).await;

	assert_eq!(response.search_summary.search_strategy, SearchStrategy::Semantic);
	assert_eq!(response.results.len(), 2);
	assert!(response.results.iter().any(|result| result.chunk.content.contains("Norse")));
	assert!(response.results.iter().any(|result| result.chunk.content.contains("golden ring")));

	let uncached = SearchRequest { limit: Some(4), ..request };
	let again = service.intelligent_search(uncached).await;

	assert_eq!(again.search_summary.search_strategy, SearchStrategy::Semantic);
	assert_eq!(again.results.len(), 2);
}
