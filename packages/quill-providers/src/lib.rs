pub mod embedding;
pub mod error;
pub mod extractor;
pub mod rerank;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

use quill_config::{EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use quill_domain::ExtractedEntities;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
		context_hint: &'a str,
	) -> BoxFuture<'a, Result<ExtractedEntities>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		extractor: Arc<dyn ExtractorProvider>,
		rerank: Arc<dyn RerankProvider>,
	) -> Self {
		Self { embedding, extractor, rerank }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), extractor: provider.clone(), rerank: provider }
	}
}

/// HTTP-backed providers speaking OpenAI-compatible JSON.
pub struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
		context_hint: &'a str,
	) -> BoxFuture<'a, Result<ExtractedEntities>> {
		Box::pin(extractor::extract(cfg, text, context_hint))
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(rerank::rerank(cfg, query, docs))
	}
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// A provider without an endpoint or key is reported as unavailable so callers degrade.
pub(crate) fn ensure_configured(
	kind: &str,
	provider_id: &str,
	api_base: &str,
	api_key: &str,
) -> Result<()> {
	if provider_id == "none" || api_base.trim().is_empty() || api_key.is_empty() {
		return Err(Error::Unavailable { message: format!("The {kind} provider is not configured.") });
	}

	Ok(())
}

pub(crate) async fn post_json(
	timeout_ms: u64,
	url: String,
	headers: HeaderMap,
	body: &Value,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
	let res = client.post(url).headers(headers).json(body).send().await?;
	let status = res.status();

	if !status.is_success() {
		let text = res.text().await.unwrap_or_default();

		return Err(Error::from_status(status, &text).unwrap_or_else(|| Error::InvalidResponse {
			message: format!("Unexpected HTTP status {status}."),
		}));
	}

	Ok(res.json().await?)
}
