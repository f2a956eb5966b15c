use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use quill_service::{AddDocumentRequest, Error};
use quill_testkit::DelayedEmbedding;

use super::Harness;

#[tokio::test]
async fn content_without_words_is_rejected() {
	let harness = Harness::new();
	let service = harness.open().await;

	for content in ["", "   \n", "!!!", "... ?! --"] {
		let err = service
			.add_document(AddDocumentRequest {
				content: content.to_string(),
				project_id: Some("P1".to_string()),
				..Default::default()
			})
			.await
			.expect_err("Expected a validation error.");

		assert!(matches!(err, Error::InvalidRequest { .. }), "{content:?}");
	}

	assert_eq!(service.chunk_count(), 0);
	assert!(service.profiles().is_empty());
}

#[tokio::test]
async fn slow_embedding_in_one_project_does_not_block_another() {
	let mut harness = Harness::new();
	let delay = Duration::from_millis(400);

	harness.embedding = Arc::new(DelayedEmbedding::when(delay, |text| text.contains("Asgard")));

	let service = harness.open().await;
	let started = Instant::now();
	let (slow, fast) = tokio::join!(
		async {
			super::add(&service, Some("P1"), "Odin brooded over Asgard all winter.").await;

			started.elapsed()
		},
		async {
			tokio::time::sleep(Duration::from_millis(20)).await;
			super::add(&service, Some("P2"), "Sigrun mended the nets by the harbour.").await;

			started.elapsed()
		},
	);

	assert!(slow >= delay);
	assert!(fast < delay, "P2 ingestion waited {fast:?} behind the P1 embedding call.");
	assert_eq!(service.chunks(Some("P1")).len(), 1);
	assert_eq!(service.chunks(Some("P2")).len(), 1);
}
