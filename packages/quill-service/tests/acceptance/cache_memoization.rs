use std::{
	convert::Infallible,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use quill_testkit::{ExtractorStep, ScriptedExtractor};

use super::Harness;

#[tokio::test]
async fn get_or_set_runs_the_producer_once_per_ttl_window() {
	let harness = Harness::new();
	let service = harness.open().await;
	let calls = Arc::new(AtomicUsize::new(0));
	let produce = || {
		let calls = calls.clone();

		async move {
			calls.fetch_add(1, Ordering::SeqCst);

			Ok::<_, Infallible>(42_u32)
		}
	};
	let ttl = Duration::from_secs(5);
	let Ok(first) = service.cache.get_or_set("k", ttl, produce).await;
	let Ok(second) = service.cache.get_or_set("k", ttl, produce).await;

	assert_eq!((first, second), (42, 42));
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	harness.clock.advance(Duration::from_secs(6));

	let Ok(_) = service.cache.get_or_set("k", ttl, produce).await;

	assert_eq!(calls.load(Ordering::SeqCst), 2);

	let stats = service.cache_stats();

	assert_eq!(stats.hits, 1);
	assert!(stats.misses >= 2);
}

#[tokio::test]
async fn identical_content_is_enriched_once() {
	let mut harness = Harness::new();
	let extractor = Arc::new(ScriptedExtractor::new([
		ExtractorStep::Entities(quill_domain::ExtractedEntities {
			characters: vec!["Brunhilde".to_string()],
			..Default::default()
		}),
	]));

	harness.cfg.enrichment.ai_extraction = true;
	harness.extractor = extractor.clone();

	let service = harness.open().await;
	let first = service.enrich_content("Brunhilde rode through the ring of fire.", None).await;
	let second = service.enrich_content("Brunhilde rode through the ring of fire.", None).await;

	assert_eq!(first, second);
	assert_eq!(extractor.calls(), 1);
}
