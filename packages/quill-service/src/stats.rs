use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use quill_domain::{ContentType, importance::NEUTRAL_IMPORTANCE, style};

use crate::QuillService;

const TOP_EMOTIONS: usize = 5;

/// Aggregate view over one project's chunks and profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
	pub project_id: String,
	pub chunk_count: usize,
	pub document_count: usize,
	pub content_types: BTreeMap<ContentType, usize>,
	pub average_importance: f32,
	pub top_emotions: Vec<String>,
	pub characters: Vec<String>,
	pub themes: Vec<String>,
	pub plot_points: Vec<String>,
	pub settings: Vec<String>,
	pub writing_style: String,
	pub tone_analysis: String,
	#[serde(with = "quill_storage::time_serde::option")]
	pub last_updated: Option<OffsetDateTime>,
}

impl QuillService {
	/// Unknown projects yield zero counts and empty sets.
	pub fn get_project_stats(&self, project_id: &str) -> ProjectStats {
		let project_id = project_id.trim().to_string();
		let entries = self.index.candidates(Some(&project_id));
		let mut content_types = BTreeMap::new();
		let mut documents = std::collections::HashSet::new();
		let mut emotions: HashMap<&str, (usize, usize)> = HashMap::new();
		let mut importance_total = 0.0;
		let mut position = 0;

		for entry in &entries {
			let metadata = &entry.chunk.metadata;

			*content_types.entry(metadata.enrichment.content_type).or_insert(0) += 1;
			documents.insert(metadata.document_id);
			importance_total += metadata.enrichment.importance;

			for emotion in &metadata.enrichment.emotions {
				emotions.entry(emotion.as_str()).or_insert((0, position)).0 += 1;
				position += 1;
			}
		}

		let mut ranked: Vec<_> = emotions.into_iter().collect();

		ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));

		let top_emotions = ranked
			.into_iter()
			.take(TOP_EMOTIONS)
			.map(|(emotion, _)| emotion.to_string())
			.collect();
		let average_importance = if entries.is_empty() {
			NEUTRAL_IMPORTANCE
		} else {
			importance_total / entries.len() as f32
		};
		let profile = self.profile(&project_id);
		let (writing_style, tone_analysis) = match &profile {
			Some(profile) if !profile.writing_style.is_empty() =>
				(profile.writing_style.clone(), profile.tone_analysis.clone()),
			_ => (
				style::writing_style(entries.iter().map(|entry| entry.chunk.content.as_str())),
				style::tone_analysis(entries.iter().flat_map(|entry| {
					entry.chunk.metadata.enrichment.emotions.iter().map(String::as_str)
				})),
			),
		};

		ProjectStats {
			chunk_count: entries.len(),
			document_count: documents.len(),
			content_types,
			average_importance,
			top_emotions,
			characters: profile.as_ref().map(|p| p.characters.clone()).unwrap_or_default(),
			themes: profile.as_ref().map(|p| p.themes.clone()).unwrap_or_default(),
			plot_points: profile.as_ref().map(|p| p.plot_points.clone()).unwrap_or_default(),
			settings: profile.as_ref().map(|p| p.settings.clone()).unwrap_or_default(),
			writing_style,
			tone_analysis,
			last_updated: profile.as_ref().map(|p| p.last_updated),
			project_id,
		}
	}
}
