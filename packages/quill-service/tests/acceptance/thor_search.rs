use std::{sync::Arc, time::Duration};

use quill_service::{SearchRequest, SearchStrategy};
use quill_testkit::{DelayedEmbedding, FailingEmbedding, FailureKind};

use super::Harness;

const THOR: &str = "Thor wielded Mjolnir against the frost giants. Loki laughed.";

#[tokio::test]
async fn ingested_passage_is_found_by_name() {
	let harness = Harness::new();
	let service = harness.open().await;

	super::add(&service, Some("P1"), THOR).await;

	let response = service
		.intelligent_search(SearchRequest {
			query: "Thor".to_string(),
			project_id: Some("P1".to_string()),
			..Default::default()
		})
		.await;

	assert_eq!(response.search_summary.search_strategy, SearchStrategy::Semantic);
	assert!(!response.results.is_empty());
	assert!(response.results[0].chunk.content.contains("Thor"));
	assert!(response.results[0].explain.boosts.iter().any(|boost| boost.name == "project"));
	assert!(response.insights.is_some());
}

#[tokio::test]
async fn results_respect_limit_and_project() {
	let harness = Harness::new();
	let service = harness.open().await;
	let topics = [
		"Thor crossed the rainbow bridge at dawn.",
		"Odin counted the ravens above the hall.",
		"Frigg wove clouds into a grey cloak.",
		"Heimdall listened for footsteps in the snow.",
		"Tyr bound the wolf with a silken ribbon.",
		"Freya searched the northern roads for her husband.",
	];

	for topic in topics {
		super::add(&service, Some("P1"), topic).await;
	}

	super::add(&service, Some("P2"), "Thor appears in another project entirely.").await;

	let response = service
		.intelligent_search(SearchRequest {
			query: "Thor bridge ravens".to_string(),
			project_id: Some("P1".to_string()),
			limit: Some(3),
			..Default::default()
		})
		.await;

	assert!(response.results.len() <= 3);
	assert!(!response.results.is_empty());
	assert!(
		response
			.results
			.iter()
			.all(|result| result.chunk.metadata.project_id.as_deref() == Some("P1"))
	);
	assert!(
		response.results.windows(2).all(|pair| pair[0].score >= pair[1].score),
		"Results must be sorted by score."
	);
}

#[tokio::test]
async fn repeated_search_is_served_from_cache_until_ingestion() {
	let harness = Harness::new();
	let service = harness.open().await;
	let request = SearchRequest {
		query: "Thor".to_string(),
		project_id: Some("P1".to_string()),
		..Default::default()
	};

	super::add(&service, Some("P1"), THOR).await;

	let first = service.intelligent_search(request.clone()).await;
	let second = service.intelligent_search(request.clone()).await;

	assert!(!first.search_summary.cached);
	assert!(second.search_summary.cached);
	assert_eq!(first.results.len(), second.results.len());

	super::add(&service, Some("P1"), "Thor slept through the long winter.").await;

	let third = service.intelligent_search(request).await;

	assert!(!third.search_summary.cached);
	assert_eq!(third.results.len(), 2);
}

#[tokio::test]
async fn passage_ingested_under_a_rate_limit_is_still_found() {
	let mut harness = Harness::new();

	harness.embedding = Arc::new(FailingEmbedding::times(FailureKind::RateLimited, 1));

	let service = harness.open().await;

	super::add(&service, Some("P1"), THOR).await;

	let response = service
		.intelligent_search(SearchRequest {
			query: "Thor".to_string(),
			project_id: Some("P1".to_string()),
			..Default::default()
		})
		.await;

	assert_eq!(response.search_summary.search_strategy, SearchStrategy::Semantic);
	assert_eq!(response.results.len(), 1);
	assert!(response.results[0].chunk.content.contains("Thor"));
}

#[tokio::test]
async fn search_overlapping_an_ingest_is_not_cached() {
	let mut harness = Harness::new();

	harness.embedding =
		Arc::new(DelayedEmbedding::when(Duration::from_millis(300), |text| text == "Thor"));

	let service = harness.open().await;
	let request = SearchRequest {
		query: "Thor".to_string(),
		project_id: Some("P1".to_string()),
		..Default::default()
	};

	super::add(&service, Some("P1"), THOR).await;

	let (first, _) = tokio::join!(service.intelligent_search(request.clone()), async {
		tokio::time::sleep(Duration::from_millis(50)).await;
		super::add(&service, Some("P1"), "Thor slept through the long winter.").await
	});

	assert_eq!(first.results.len(), 1);
	assert_eq!(service.chunks(Some("P1")).len(), 2);

	let second = service.intelligent_search(request).await;

	assert!(!second.search_summary.cached);
	assert_eq!(second.results.len(), 2);
}
