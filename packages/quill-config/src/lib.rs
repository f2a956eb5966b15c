mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Chunking, Config, Dedup, EmbeddingProviderConfig, Enrichment, LlmProviderConfig,
	ProviderConfig, Profiles, Providers, Ranking, RankingRerank, Search, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

/// Parses, normalizes, and validates an in-memory TOML document.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::validation("service.log_level must be non-empty."));
	}
	if cfg.storage.snapshot_path.as_os_str().is_empty() {
		return Err(Error::validation("storage.snapshot_path must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::validation(
			"providers.embedding.dimensions must be greater than zero.",
		));
	}

	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("llm_extractor", cfg.providers.llm_extractor.timeout_ms),
		("rerank", cfg.providers.rerank.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
	}

	if cfg.cache.enabled {
		for (label, ttl) in [
			("cache.enrichment_ttl_secs", cfg.cache.enrichment_ttl_secs),
			("cache.profile_ttl_secs", cfg.cache.profile_ttl_secs),
			("cache.search_ttl_secs", cfg.cache.search_ttl_secs),
		] {
			if ttl == 0 {
				return Err(Error::Validation {
					message: format!("{label} must be greater than zero when the cache is enabled."),
				});
			}
		}
	}
	if cfg.cache.soft_max_keys == 0 {
		return Err(Error::validation("cache.soft_max_keys must be greater than zero."));
	}
	if !cfg.cache.evict_fraction.is_finite()
		|| cfg.cache.evict_fraction <= 0.0
		|| cfg.cache.evict_fraction > 1.0
	{
		return Err(Error::validation("cache.evict_fraction must be in the range (0.0, 1.0]."));
	}
	if cfg.cache.optimize_interval_secs == 0 {
		return Err(Error::validation("cache.optimize_interval_secs must be greater than zero."));
	}
	if cfg.enrichment.max_entities == 0 {
		return Err(Error::validation("enrichment.max_entities must be greater than zero."));
	}
	if !(1.0..=10.0).contains(&cfg.enrichment.base_importance) {
		return Err(Error::validation("enrichment.base_importance must be in the range 1.0-10.0."));
	}
	if cfg.chunking.max_words == 0 {
		return Err(Error::validation("chunking.max_words must be greater than zero."));
	}
	if cfg.chunking.overlap_words >= cfg.chunking.max_words {
		return Err(Error::validation("chunking.overlap_words must be less than chunking.max_words."));
	}
	if !(0.0..=1.0).contains(&cfg.dedup.jaccard_threshold) {
		return Err(Error::validation("dedup.jaccard_threshold must be in the range 0.0-1.0."));
	}
	if cfg.search.default_limit == 0 {
		return Err(Error::validation("search.default_limit must be greater than zero."));
	}
	if cfg.search.default_limit > cfg.search.max_limit {
		return Err(Error::validation(
			"search.default_limit must be less than or equal to search.max_limit.",
		));
	}
	if cfg.search.overfetch_factor == 0 {
		return Err(Error::validation("search.overfetch_factor must be greater than zero."));
	}

	for (label, value) in [
		("ranking.project_boost", cfg.ranking.project_boost),
		("ranking.theme_weight", cfg.ranking.theme_weight),
		("ranking.character_weight", cfg.ranking.character_weight),
		("ranking.importance_weight", cfg.ranking.importance_weight),
		("ranking.content_type_boost", cfg.ranking.content_type_boost),
		("ranking.rerank.weight", cfg.ranking.rerank.weight),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	// Importance spans 1-10, so the deviation factor must stay positive at importance 1.
	if cfg.ranking.importance_weight >= 0.25 {
		return Err(Error::validation("ranking.importance_weight must be less than 0.25."));
	}
	if cfg.ranking.rerank.enabled && cfg.ranking.rerank.max_candidates == 0 {
		return Err(Error::validation(
			"ranking.rerank.max_candidates must be greater than zero when enabled.",
		));
	}

	for (label, cap) in [
		("profiles.max_characters", cfg.profiles.max_characters),
		("profiles.max_themes", cfg.profiles.max_themes),
		("profiles.max_plot_points", cfg.profiles.max_plot_points),
		("profiles.max_settings", cfg.profiles.max_settings),
	] {
		if cap == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.providers.embedding.api_key = cfg.providers.embedding.api_key.trim().to_string();
	cfg.providers.llm_extractor.api_key = cfg.providers.llm_extractor.api_key.trim().to_string();
	cfg.providers.rerank.api_key = cfg.providers.rerank.api_key.trim().to_string();

	if cfg.storage.backup_dir.as_ref().map(|dir| dir.as_os_str().is_empty()).unwrap_or(false) {
		cfg.storage.backup_dir = None;
	}
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
