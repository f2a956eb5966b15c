use serde_json::Value;

use quill_domain::ExtractedEntities;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 2;
const SYSTEM_PROMPT: &str = "You extract story metadata from a passage of fiction. Reply with a single JSON object \
with the keys characters, themes, emotions, plotElements, semanticTags, settings. Each value is an array \
of short strings. Use an empty array when nothing applies.";

pub async fn extract(
	cfg: &quill_config::LlmProviderConfig,
	text: &str,
	context_hint: &str,
) -> Result<ExtractedEntities> {
	crate::ensure_configured("extractor", &cfg.provider_id, &cfg.api_base, &cfg.api_key)?;

	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": build_messages(text, context_hint),
	});
	let mut last_err = None;

	for attempt in 0..MAX_ATTEMPTS {
		let json = crate::post_json(cfg.timeout_ms, url.clone(), headers.clone(), &body).await?;

		match parse_extractor_json(json) {
			Ok(parsed) => return Ok(parsed),
			Err(err) => {
				tracing::debug!(attempt, error = %err, "Extractor returned an unparsable response.");

				last_err = Some(err);
			},
		}
	}

	Err(last_err.unwrap_or_else(|| Error::InvalidResponse {
		message: "Extractor produced no response.".to_string(),
	}))
}

fn build_messages(text: &str, context_hint: &str) -> Value {
	let user = if context_hint.trim().is_empty() {
		format!("Passage:\n{text}")
	} else {
		format!("Known project context: {context_hint}\n\nPassage:\n{text}")
	};

	serde_json::json!([
		{ "role": "system", "content": SYSTEM_PROMPT },
		{ "role": "user", "content": user },
	])
}

fn parse_extractor_json(json: Value) -> Result<ExtractedEntities> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		return parse_content(content);
	}
	if json.is_object() && json.get("choices").is_none() {
		return serde_json::from_value(json.clone()).map_err(|err| Error::MalformedResponse {
			message: err.to_string(),
			raw: json.to_string(),
		});
	}

	Err(Error::MalformedResponse {
		message: "Extractor response is missing JSON content.".to_string(),
		raw: json.to_string(),
	})
}

fn parse_content(content: &str) -> Result<ExtractedEntities> {
	let trimmed = strip_code_fence(content.trim());

	serde_json::from_str(trimmed).map_err(|err| Error::MalformedResponse {
		message: format!("Extractor content is not valid JSON: {err}."),
		raw: content.to_string(),
	})
}

fn strip_code_fence(content: &str) -> &str {
	let Some(rest) = content.strip_prefix("```") else {
		return content;
	};
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}
