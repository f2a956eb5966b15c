use serde::{Deserialize, Serialize};

use crate::{content_type::ContentType, importance};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
	#[default]
	Rules,
	Model,
}

/// Enrichment bundle attached to every chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentMetadata {
	pub content_type: ContentType,
	pub characters: Vec<String>,
	pub themes: Vec<String>,
	pub emotions: Vec<String>,
	pub plot_elements: Vec<String>,
	pub semantic_tags: Vec<String>,
	pub settings: Vec<String>,
	pub importance: f32,
	pub source: ExtractionSource,
}
impl Default for ContentMetadata {
	fn default() -> Self {
		Self {
			content_type: ContentType::default(),
			characters: Vec::new(),
			themes: Vec::new(),
			emotions: Vec::new(),
			plot_elements: Vec::new(),
			semantic_tags: Vec::new(),
			settings: Vec::new(),
			importance: importance::NEUTRAL_IMPORTANCE,
			source: ExtractionSource::default(),
		}
	}
}

/// Entities returned by a model-assisted extractor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedEntities {
	pub characters: Vec<String>,
	pub themes: Vec<String>,
	pub emotions: Vec<String>,
	#[serde(alias = "plotElements", alias = "plot")]
	pub plot_elements: Vec<String>,
	#[serde(alias = "semanticTags", alias = "tags")]
	pub semantic_tags: Vec<String>,
	#[serde(alias = "locations")]
	pub settings: Vec<String>,
}
impl ExtractedEntities {
	pub fn is_empty(&self) -> bool {
		self.characters.is_empty()
			&& self.themes.is_empty()
			&& self.emotions.is_empty()
			&& self.plot_elements.is_empty()
			&& self.semantic_tags.is_empty()
			&& self.settings.is_empty()
	}
}
