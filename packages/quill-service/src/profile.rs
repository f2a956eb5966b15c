//! Per-project profile aggregation.

use std::time::Duration;

use quill_chunking::ChunkingConfig;
use quill_domain::{ContentMetadata, ExtractedEntities, style, text};
use quill_storage::ProjectProfile;

use crate::{Error, QuillService, Result};

const CACHE_NAMESPACE: &str = "profile";

pub(crate) fn cache_key(project_id: &str) -> String {
	format!("{CACHE_NAMESPACE}:{project_id}")
}

pub(crate) fn entities_of(metadata: &ContentMetadata) -> ExtractedEntities {
	ExtractedEntities {
		characters: metadata.characters.clone(),
		themes: metadata.themes.clone(),
		emotions: metadata.emotions.clone(),
		plot_elements: metadata.plot_elements.clone(),
		semantic_tags: metadata.semantic_tags.clone(),
		settings: metadata.settings.clone(),
	}
}

impl QuillService {
	/// Profile for `project_id`, creating it from the project store when none exists yet.
	///
	/// Returns `None` for blank ids and for projects the store does not know and the index has
	/// never seen.
	pub async fn sync_project_context(&self, project_id: &str) -> Option<ProjectProfile> {
		let project_id = crate::clean_id(Some(project_id))?;
		let key = cache_key(&project_id);
		let ttl = Duration::from_secs(self.cfg.cache.profile_ttl_secs);

		if let Some(profile) = self.cache.get::<ProjectProfile>(&key) {
			return Some(profile);
		}
		if let Some(profile) = self.profile(&project_id) {
			self.cache.set(&key, &profile, ttl);

			return Some(profile);
		}

		let source = match self.project_store.get_project(&project_id).await {
			Ok(source) => Some(source),
			Err(quill_storage::Error::NotFound(_)) => {
				tracing::debug!(project_id = %project_id, "Project not found in the project store.");

				None
			},
			Err(err) => {
				tracing::warn!(error = %err, project_id = %project_id, "Project store read failed.");

				None
			},
		};
		let _guard = self.write_lock.lock().await;
		// Another sync may have created the profile while the store was read.
		let profile = if let Some(existing) = self.profile(&project_id) {
			existing
		} else if let Some(source) = source {
			let profile = self.profile_from_source(&project_id, &source.content).await;

			tracing::info!(
				project_id = %project_id,
				title = %source.title,
				characters = profile.characters.len(),
				themes = profile.themes.len(),
				"Project profile created from source content."
			);

			self.persist().await;

			profile
		} else if self.index.project_len(&project_id) > 0 {
			let profile = self.rebuild_profile(&project_id);

			self.persist().await;

			profile
		} else {
			return None;
		};

		self.invalidate_project(Some(&project_id));
		self.cache.set(&key, &profile, ttl);

		Some(profile)
	}

	/// Unions `entities` into the project's profile and persists the result.
	pub async fn merge_into_profile(
		&self,
		project_id: &str,
		entities: &ExtractedEntities,
	) -> Result<ProjectProfile> {
		let Some(project_id) = crate::clean_id(Some(project_id)) else {
			return Err(Error::InvalidRequest { message: "project_id must not be empty.".to_string() });
		};
		let _guard = self.write_lock.lock().await;
		let profile = self.merge_entities(&project_id, std::iter::once(entities));

		self.invalidate_project(Some(&project_id));
		self.persist().await;

		Ok(profile)
	}

	/// Caller must hold the write lock.
	pub(crate) fn merge_entities<'a, I>(&self, project_id: &str, batch: I) -> ProjectProfile
	where
		I: IntoIterator<Item = &'a ExtractedEntities>,
	{
		let caps = &self.cfg.profiles;
		let now = self.clock.now();
		let mut profiles = self.profiles.write().unwrap_or_else(|err| err.into_inner());
		let profile = profiles
			.entry(project_id.to_string())
			.or_insert_with(|| ProjectProfile::new(project_id, now));
		let mut added = 0;

		for entities in batch {
			added += text::bounded_union(&mut profile.characters, &entities.characters, caps.max_characters);
			added += text::bounded_union(&mut profile.themes, &entities.themes, caps.max_themes);
			added += text::bounded_union(
				&mut profile.plot_points,
				&entities.plot_elements,
				caps.max_plot_points,
			);
			added += text::bounded_union(&mut profile.settings, &entities.settings, caps.max_settings);
		}

		profile.last_updated = now;

		tracing::debug!(project_id, added, "Project profile merged.");

		profile.clone()
	}

	/// Recomputes style and tone from the project's indexed chunks.
	pub(crate) fn refresh_style(&self, project_id: &str) -> Option<ProjectProfile> {
		let entries = self.index.candidates(Some(project_id));

		if entries.is_empty() {
			return self.profile(project_id);
		}

		let writing_style = style::writing_style(entries.iter().map(|entry| entry.chunk.content.as_str()));
		let tone = style::tone_analysis(
			entries
				.iter()
				.flat_map(|entry| entry.chunk.metadata.enrichment.emotions.iter().map(String::as_str)),
		);
		let mut profiles = self.profiles.write().unwrap_or_else(|err| err.into_inner());
		let profile = profiles.get_mut(project_id)?;

		profile.writing_style = writing_style;
		profile.tone_analysis = tone;

		Some(profile.clone())
	}

	/// Derives a profile purely from indexed chunks, replacing any existing one.
	pub(crate) fn rebuild_profile(&self, project_id: &str) -> ProjectProfile {
		let entries = self.index.candidates(Some(project_id));
		let batch: Vec<ExtractedEntities> =
			entries.iter().map(|entry| entities_of(&entry.chunk.metadata.enrichment)).collect();

		self.profiles.write().unwrap_or_else(|err| err.into_inner()).remove(project_id);

		let merged = self.merge_entities(project_id, &batch);

		self.refresh_style(project_id).unwrap_or(merged)
	}

	async fn profile_from_source(&self, project_id: &str, content: &str) -> ProjectProfile {
		let chunking = ChunkingConfig {
			max_words: self.cfg.chunking.max_words,
			overlap_words: self.cfg.chunking.overlap_words,
		};
		let pieces = quill_chunking::split_text(content, &chunking);
		let mut batch = Vec::with_capacity(pieces.len());
		let mut emotions = Vec::new();

		for piece in &pieces {
			let metadata = self.enrich_content(&piece.text, None).await;

			emotions.extend(metadata.emotions.iter().cloned());
			batch.push(entities_of(&metadata));
		}

		let merged = self.merge_entities(project_id, &batch);
		let mut profiles = self.profiles.write().unwrap_or_else(|err| err.into_inner());
		let Some(profile) = profiles.get_mut(project_id) else {
			return merged;
		};

		profile.writing_style = style::writing_style(pieces.iter().map(|piece| piece.text.as_str()));
		profile.tone_analysis = style::tone_analysis(emotions.iter().map(String::as_str));

		profile.clone()
	}
}
