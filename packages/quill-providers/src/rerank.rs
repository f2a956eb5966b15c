use serde_json::Value;

use crate::{Error, Result};

pub async fn rerank(
	cfg: &quill_config::ProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	crate::ensure_configured("rerank", &cfg.provider_id, &cfg.api_base, &cfg.api_key)?;

	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": docs });
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let json = crate::post_json(cfg.timeout_ms, url, headers, &body).await?;

	parse_rerank_response(json, docs.len())
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let mut scores = vec![0.0_f32; doc_count];
	let results = json.get("results").or_else(|| json.get("data")).and_then(|v| v.as_array()).ok_or_else(
		|| Error::InvalidResponse { message: "Rerank response is missing results array.".to_string() },
	)?;

	for item in results {
		let index = item.get("index").and_then(|v| v.as_u64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Rerank result missing index.".to_string() }
		})? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Rerank result missing score.".to_string(),
			})? as f32;

		if let Some(slot) = scores.get_mut(index) {
			*slot = score;
		}
	}

	Ok(scores)
}
