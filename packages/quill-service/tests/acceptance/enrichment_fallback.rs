use std::{sync::Arc, time::Duration};

use quill_domain::{ExtractedEntities, ExtractionSource};
use quill_service::QuillService;
use quill_testkit::{ExtractorStep, FailureKind, ScriptedExtractor};

use super::Harness;

const PASSAGE: &str = "Sigurd rode through the flames toward the sleeping shieldmaiden.";

async fn service_with(steps: Vec<ExtractorStep>) -> (Harness, QuillService) {
	let mut harness = Harness::new();

	harness.cfg.enrichment.ai_extraction = true;
	harness.extractor = Arc::new(ScriptedExtractor::new(steps));

	let service = harness.open().await;

	(harness, service)
}

#[tokio::test]
async fn model_entities_take_precedence() {
	let (_harness, service) = service_with(vec![ExtractorStep::Entities(ExtractedEntities {
		characters: vec!["Sigurd".to_string(), "Brunhilde".to_string()],
		themes: vec!["fate".to_string()],
		..Default::default()
	})])
	.await;
	let metadata = service.enrich_content(PASSAGE, None).await;

	assert_eq!(metadata.source, ExtractionSource::Model);
	assert_eq!(metadata.characters, vec!["Sigurd".to_string(), "Brunhilde".to_string()]);
	assert_eq!(metadata.themes, vec!["fate".to_string()]);
	assert!((1.0..=10.0).contains(&metadata.importance));
}

#[tokio::test]
async fn malformed_output_is_parsed_line_by_line() {
	let (_harness, service) = service_with(vec![ExtractorStep::Malformed(
		"Characters: Sigurd, Fafnir\nThemes: greed".to_string(),
	)])
	.await;
	let metadata = service.enrich_content(PASSAGE, None).await;

	assert_eq!(metadata.source, ExtractionSource::Model);
	assert_eq!(metadata.characters, vec!["Sigurd".to_string(), "Fafnir".to_string()]);
	assert_eq!(metadata.themes, vec!["greed".to_string()]);
}

#[tokio::test]
async fn unusable_or_failed_extraction_falls_back_to_rules() {
	let steps = vec![
		ExtractorStep::Malformed("I cannot help with that.".to_string()),
		ExtractorStep::Fail(FailureKind::RateLimited),
		ExtractorStep::Hang(Duration::from_secs(2)),
	];
	let (_harness, service) = service_with(steps).await;

	for passage in [PASSAGE, "Gudrun wept beside the river.", "Atli feasted in his hall."] {
		let metadata = service.enrich_content(passage, None).await;

		assert_eq!(metadata.source, ExtractionSource::Rules, "{passage}");
		assert!((1.0..=10.0).contains(&metadata.importance));
	}
}

#[tokio::test]
async fn ingestion_succeeds_when_the_extractor_fails() {
	let (_harness, service) = service_with(vec![ExtractorStep::Fail(FailureKind::Unavailable)]).await;
	let response = service
		.add_document(quill_service::AddDocumentRequest {
			content: PASSAGE.to_string(),
			project_id: Some("P1".to_string()),
			..Default::default()
		})
		.await
		.expect("Ingestion must not fail on extractor errors.");

	assert_eq!(response.chunks.len(), 1);
	assert_eq!(service.chunks(Some("P1"))[0].metadata.enrichment.source, ExtractionSource::Rules);
}
