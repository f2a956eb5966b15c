use std::sync::Arc;

use quill_service::{AddDocumentRequest, SearchRequest, SearchStrategy};
use quill_storage::SnapshotStore;
use quill_testkit::{FailingEmbedding, FailureKind, HashEmbedding};

use super::Harness;

#[tokio::test]
async fn reload_restores_identical_chunks_and_profiles() {
	let mut harness = Harness::new();
	let (chunks, profiles) = {
		let service = harness.open().await;

		super::add(&service, Some("P1"), "Thor wielded Mjolnir against the frost giants. Loki laughed.")
			.await;
		super::add(&service, Some("P1"), "Sif braided her golden hair beside the hearth.").await;
		super::add(&service, None, "An unfiled note about dragons and gold.").await;

		(service.chunks(None), service.profiles())
	};
	let embedding = Arc::new(HashEmbedding::default());

	harness.embedding = embedding.clone();

	let reopened = harness.open().await;

	assert_eq!(reopened.chunks(None), chunks);
	assert_eq!(reopened.profiles(), profiles);
	assert_eq!(embedding.calls(), 0, "Stored vectors must be reused.");

	let backups = SnapshotStore::new(&harness.cfg.storage).backups().expect("Failed to list backups.");

	assert!(!backups.is_empty());
	assert!(backups.len() <= harness.cfg.storage.max_backups as usize);
}

#[tokio::test]
async fn missing_vectors_are_re_embedded_on_startup() {
	let mut harness = Harness::new();

	harness.embedding = Arc::new(FailingEmbedding::always(FailureKind::Unavailable));

	{
		let service = harness.open().await;

		super::add(&service, Some("P1"), "Thor wielded Mjolnir against the frost giants.").await;
		super::add(&service, Some("P1"), "Odin traded an eye for wisdom at the well.").await;
	}

	let embedding = Arc::new(HashEmbedding::default());

	harness.embedding = embedding.clone();

	let reopened = harness.open().await;

	assert_eq!(embedding.calls(), 1);

	let response = reopened
		.intelligent_search(SearchRequest {
			query: "Odin wisdom".to_string(),
			project_id: Some("P1".to_string()),
			..Default::default()
		})
		.await;

	assert_eq!(response.search_summary.search_strategy, SearchStrategy::Semantic);
	assert_eq!(response.results.len(), 2);
}

#[tokio::test]
async fn legacy_snapshot_without_profiles_rebuilds_them() {
	let harness = Harness::new();
	let legacy = serde_json::json!({
		"documents": [{
			"content": "Thor and Loki argued beneath the great ash tree.",
			"metadata": {
				"documentId": "6f1c2a7e-9d1b-4c53-9a3e-2a1f0d9b8c71",
				"projectId": "P9",
				"contentType": "narrative",
				"characters": ["Thor", "Loki"],
				"themes": ["mythology"],
				"importance": 6.5,
				"createdAt": "2026-01-01T00:00:00Z"
			}
		}],
		"timestamp": "2026-01-01T00:00:00Z",
		"version": 1
	});

	std::fs::write(&harness.cfg.storage.snapshot_path, legacy.to_string())
		.expect("Failed to write legacy snapshot.");

	let service = harness.open().await;
	let profiles = service.profiles();

	assert_eq!(service.chunks(Some("P9")).len(), 1);
	assert_eq!(profiles.len(), 1);
	assert_eq!(profiles[0].project_id, "P9");
	assert_eq!(profiles[0].characters, vec!["Thor".to_string(), "Loki".to_string()]);
	assert_eq!(profiles[0].themes, vec!["mythology".to_string()]);
}

#[tokio::test]
async fn snapshot_write_failure_keeps_the_in_memory_document() {
	let mut harness = Harness::new();
	let blocker = harness.dir.write("blocker", "not a directory").expect("Failed to write blocker file.");

	harness.cfg.storage.snapshot_path = blocker.join("quill.json");

	let service = harness.open().await;
	let response = service
		.add_document(AddDocumentRequest {
			content: "Thor wielded Mjolnir against the frost giants.".to_string(),
			project_id: Some("P1".to_string()),
			..Default::default()
		})
		.await
		.expect("Ingestion must survive snapshot write failures.");

	assert_eq!(response.chunks.len(), 1);
	assert!(!harness.cfg.storage.snapshot_path.exists());

	let search = service
		.intelligent_search(SearchRequest {
			query: "Thor".to_string(),
			project_id: Some("P1".to_string()),
			..Default::default()
		})
		.await;

	assert_eq!(search.results.len(), 1);
	assert_eq!(search.results[0].chunk.id, response.chunks[0].chunk_id);
	assert!(service.sync_project_context("P1").await.is_some());
}

#[tokio::test]
async fn corrupt_snapshot_recovers_from_the_newest_backup() {
	let harness = Harness::new();

	{
		let service = harness.open().await;

		super::add(&service, Some("P1"), "Thor wielded Mjolnir against the frost giants.").await;
		super::add(&service, Some("P1"), "Sif braided her golden hair beside the hearth.").await;
	}

	std::fs::write(&harness.cfg.storage.snapshot_path, "{ truncated")
		.expect("Failed to corrupt snapshot.");

	let service = harness.open().await;
	let chunks = service.chunks(Some("P1"));

	assert_eq!(chunks.len(), 1);
	assert!(chunks[0].content.contains("Thor"));
	assert_eq!(service.profiles().len(), 1);
}

#[tokio::test]
async fn unsupported_snapshot_without_backups_starts_empty() {
	let harness = Harness::new();

	std::fs::write(
		&harness.cfg.storage.snapshot_path,
		r#"{"documents": [], "timestamp": "2026-01-01T00:00:00Z", "version": 99}"#,
	)
	.expect("Failed to write snapshot.");

	let service = harness.open().await;

	assert_eq!(service.chunk_count(), 0);

	super::add(&service, Some("P1"), "Odin traded an eye for wisdom at the well.").await;

	assert_eq!(service.chunk_count(), 1);
}
