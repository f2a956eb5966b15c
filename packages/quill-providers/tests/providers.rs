use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use quill_providers::{EmbeddingProvider, Error, ExtractorProvider, Providers};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		quill_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = quill_providers::auth_headers("secret", &defaults).expect_err("Expected an error.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

fn unconfigured_embedding() -> quill_config::EmbeddingProviderConfig {
	quill_config::EmbeddingProviderConfig {
		provider_id: "openai".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: String::new(),
		path: "/embeddings".to_string(),
		model: "text-embedding-3-small".to_string(),
		dimensions: 8,
		timeout_ms: 500,
		default_headers: Map::new(),
	}
}

#[tokio::test]
async fn missing_api_key_is_reported_as_unavailable() {
	let providers = Providers::default();
	let cfg = unconfigured_embedding();
	let texts = vec!["Thor".to_string()];
	let err = providers.embedding.embed(&cfg, &texts).await.expect_err("Expected an error.");

	assert!(matches!(err, Error::Unavailable { .. }));
	assert!(err.is_degradable());
}

#[tokio::test]
async fn default_extractor_without_provider_is_unavailable() {
	let providers = Providers::default();
	let cfg = quill_config::LlmProviderConfig {
		provider_id: "none".to_string(),
		api_base: String::new(),
		api_key: String::new(),
		path: String::new(),
		model: String::new(),
		temperature: 0.0,
		timeout_ms: 500,
		default_headers: Map::new(),
	};
	let err = providers.extractor.extract(&cfg, "Thor", "").await.expect_err("Expected an error.");

	assert!(err.is_degradable());
}
