use std::{convert::Infallible, time::Duration};

use quill_domain::{ContentMetadata, KnownEntities, ai_lines};
use quill_storage::ProjectProfile;

use crate::{QuillService, cache};

impl QuillService {
	/// Enrichment bundle for `content`, memoized per content and known project entities. Model
	/// extraction failures fall back to the rule-based extractor, so this never fails.
	pub async fn enrich_content(
		&self,
		content: &str,
		profile: Option<&ProjectProfile>,
	) -> ContentMetadata {
		let known = profile.map(ProjectProfile::known_entities).unwrap_or_default();
		let hint = profile.map(ProjectProfile::context_hint).unwrap_or_default();
		let key = self.enrichment_cache_key(content, &known);
		let ttl = Duration::from_secs(self.cfg.cache.enrichment_ttl_secs);
		let Ok(metadata) = self
			.cache
			.get_or_set(&key, ttl, || async {
				Ok::<_, Infallible>(self.extract_metadata(content, &known, &hint).await)
			})
			.await;

		metadata
	}

	fn ai_extraction_enabled(&self) -> bool {
		self.cfg.enrichment.ai_extraction && self.cfg.providers.llm_extractor.provider_id != "none"
	}

	fn enrichment_cache_key(&self, content: &str, known: &KnownEntities) -> String {
		let payload = serde_json::json!({
			"content": content,
			"characters": known.characters,
			"themes": known.themes,
			"settings": known.settings,
			"ai": self.ai_extraction_enabled(),
			"max_entities": self.cfg.enrichment.max_entities,
		});

		cache::hash_cache_key("enrich", &payload)
	}

	async fn extract_metadata(
		&self,
		content: &str,
		known: &KnownEntities,
		hint: &str,
	) -> ContentMetadata {
		let cfg = &self.cfg.enrichment;

		if !self.ai_extraction_enabled() {
			return quill_domain::enrich_rule_based(content, known, cfg);
		}

		let llm = &self.cfg.providers.llm_extractor;
		let timeout = Duration::from_millis(llm.timeout_ms);
		let attempt =
			tokio::time::timeout(timeout, self.providers.extractor.extract(llm, content, hint)).await;

		match attempt {
			Ok(Ok(extracted)) if !extracted.is_empty() =>
				quill_domain::enrich_with_extraction(content, known, &extracted, cfg),
			Ok(Ok(_)) => quill_domain::enrich_rule_based(content, known, cfg),
			Ok(Err(quill_providers::Error::MalformedResponse { message, raw })) => {
				match ai_lines::parse(&raw) {
					Some(extracted) => {
						tracing::debug!(
							reason = %message,
							"Extractor output was not JSON. Used the line parser."
						);

						quill_domain::enrich_with_extraction(content, known, &extracted, cfg)
					},
					None => {
						tracing::warn!(
							reason = %message,
							"Extractor output was unusable. Falling back to rule-based enrichment."
						);

						quill_domain::enrich_rule_based(content, known, cfg)
					},
				}
			},
			Ok(Err(err)) => {
				tracing::warn!(
					error = %err,
					kind = err.kind(),
					"Extractor failed. Falling back to rule-based enrichment."
				);

				quill_domain::enrich_rule_based(content, known, cfg)
			},
			Err(_) => {
				tracing::warn!(
					timeout_ms = llm.timeout_ms,
					"Extractor timed out. Falling back to rule-based enrichment."
				);

				quill_domain::enrich_rule_based(content, known, cfg)
			},
		}
	}
}
