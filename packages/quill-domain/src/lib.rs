//! Deterministic text rules: classification, entity extraction, importance, and style.

pub mod ai_lines;
pub mod clock;
pub mod content_type;
pub mod entities;
pub mod importance;
pub mod metadata;
pub mod query;
pub mod style;
pub mod text;

pub use clock::{Clock, SystemClock};
pub use content_type::{ContentType, TextSignals};
pub use entities::KnownEntities;
pub use metadata::{ContentMetadata, ExtractedEntities, ExtractionSource};
pub use query::QueryAnalysis;

use importance::ImportanceSignals;

/// Full rule-based enrichment. Never fails.
pub fn enrich_rule_based(
	raw: &str,
	known: &KnownEntities,
	cfg: &quill_config::Enrichment,
) -> ContentMetadata {
	let signals = TextSignals::from_text(raw);
	let cap = cfg.max_entities;
	let settings = entities::extract_settings(raw, known, cap);
	let characters = entities::extract_characters(raw, known, &settings, cap);
	let themes = entities::detect_themes(raw, known, cap);
	let plot_elements = entities::detect_plot_elements(raw, cap);

	finish(
		raw,
		&signals,
		cfg,
		ContentMetadata {
			content_type: content_type::classify_signals(&signals),
			characters,
			themes,
			emotions: entities::detect_emotions(raw, cap),
			plot_elements,
			semantic_tags: entities::semantic_tags(raw, cap),
			settings,
			importance: cfg.base_importance,
			source: ExtractionSource::Rules,
		},
	)
}

/// Combines model-extracted entities with the rule-based pass. Model values come first; a field
/// the model left empty is filled from the rules.
pub fn enrich_with_extraction(
	raw: &str,
	known: &KnownEntities,
	extracted: &ExtractedEntities,
	cfg: &quill_config::Enrichment,
) -> ContentMetadata {
	let rules = enrich_rule_based(raw, known, cfg);
	let signals = TextSignals::from_text(raw);
	let cap = cfg.max_entities;
	let pick = |model: &[String], fallback: &[String]| {
		let sanitized = text::sanitize_entities(model, cap);

		if sanitized.is_empty() { fallback.to_vec() } else { sanitized }
	};

	finish(
		raw,
		&signals,
		cfg,
		ContentMetadata {
			content_type: rules.content_type,
			characters: pick(&extracted.characters, &rules.characters),
			themes: pick(&extracted.themes, &rules.themes),
			emotions: pick(&extracted.emotions, &rules.emotions),
			plot_elements: pick(&extracted.plot_elements, &rules.plot_elements),
			semantic_tags: pick(&extracted.semantic_tags, &rules.semantic_tags),
			settings: pick(&extracted.settings, &rules.settings),
			importance: cfg.base_importance,
			source: ExtractionSource::Model,
		},
	)
}

fn finish(
	raw: &str,
	signals: &TextSignals,
	cfg: &quill_config::Enrichment,
	mut metadata: ContentMetadata,
) -> ContentMetadata {
	metadata.importance = importance::score(
		cfg.base_importance,
		ImportanceSignals {
			characters: metadata.characters.len(),
			themes: metadata.themes.len(),
			plot_elements: metadata.plot_elements.len(),
			has_dialogue: signals.has_dialogue(),
			has_action: entities::has_action(raw),
		},
	);

	metadata
}
