use quill_service::SearchRequest;

use super::Harness;

#[tokio::test]
async fn deleting_a_project_removes_chunks_profile_and_cached_results() {
	let harness = Harness::new();
	let service = harness.open().await;

	super::add(&service, Some("P1"), "Thor wielded Mjolnir against the frost giants.").await;
	super::add(&service, Some("P1"), "Sif braided her golden hair beside the hearth.").await;
	super::add(&service, Some("P2"), "Odin traded an eye for wisdom at the well.").await;

	let request = SearchRequest {
		query: "Thor".to_string(),
		project_id: Some("P1".to_string()),
		..Default::default()
	};

	assert!(!service.intelligent_search(request.clone()).await.results.is_empty());

	let report = service.delete_project_documents("P1").await;

	assert_eq!(report.removed_chunks, 2);
	assert!(report.profile_removed);
	assert!(service.chunks(Some("P1")).is_empty());
	assert_eq!(service.chunks(Some("P2")).len(), 1);

	let after = service.intelligent_search(request).await;

	assert!(!after.search_summary.cached);
	assert!(after.results.is_empty());
	assert_eq!(service.get_project_stats("P1").chunk_count, 0);

	drop(service);

	let reopened = harness.open().await;

	assert!(reopened.chunks(Some("P1")).is_empty());
	assert_eq!(reopened.profiles().len(), 1);
}

#[tokio::test]
async fn deleting_an_unknown_project_is_a_no_op() {
	let harness = Harness::new();
	let service = harness.open().await;
	let report = service.delete_project_documents("ghost").await;

	assert_eq!(report.removed_chunks, 0);
	assert!(!report.profile_removed);
}
