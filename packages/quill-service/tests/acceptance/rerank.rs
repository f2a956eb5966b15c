use std::sync::Arc;

use quill_service::SearchRequest;
use quill_testkit::{FailingEmbedding, FailureKind, StaticRerank};

use super::Harness;

fn harness(rerank: StaticRerank) -> Harness {
	let mut harness = Harness::new();

	harness.cfg.ranking.rerank.enabled = true;
	harness.embedding = Arc::new(FailingEmbedding::always(FailureKind::RateLimited));
	harness.rerank = Arc::new(rerank);

	harness
}

fn request() -> SearchRequest {
	SearchRequest { query: "Thor".to_string(), ..Default::default() }
}

#[tokio::test]
async fn rerank_scores_multiply_the_composite_score() {
	let harness = harness(StaticRerank::favoring("ravens"));
	let service = harness.open().await;

	super::add(&service, None, "Thor rode north through the snow.").await;
	super::add(&service, None, "Thor counted the ravens on the roof.").await;

	let response = service.intelligent_search(request()).await;
	let ravens = response
		.results
		.iter()
		.find(|result| result.chunk.content.contains("ravens"))
		.expect("Expected the ravens passage.");
	let north = response
		.results
		.iter()
		.find(|result| result.chunk.content.contains("north"))
		.expect("Expected the north passage.");
	let boost = ravens.explain.boosts.iter().find(|boost| boost.name == "rerank");

	assert_eq!(boost.map(|boost| boost.factor), Some(1.5));
	assert!(north.explain.boosts.iter().all(|boost| boost.name != "rerank"));
}

#[tokio::test]
async fn rerank_failure_keeps_deterministic_results() {
	let harness = harness(StaticRerank::failing());
	let service = harness.open().await;

	super::add(&service, None, "Thor rode north through the snow.").await;

	let response = service.intelligent_search(request()).await;

	assert_eq!(response.results.len(), 1);
	assert!(response.results[0].explain.boosts.iter().all(|boost| boost.name != "rerank"));
}
