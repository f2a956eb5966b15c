use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub enrichment: Enrichment,
	#[serde(default)]
	pub chunking: Chunking,
	#[serde(default)]
	pub dedup: Dedup,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub profiles: Profiles,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	/// Path of the live snapshot document.
	pub snapshot_path: PathBuf,
	/// Directory for timestamped copies taken before each overwrite. Defaults to a
	/// `backups` directory next to the snapshot.
	#[serde(default)]
	pub backup_dir: Option<PathBuf>,
	#[serde(default = "default_max_backups")]
	pub max_backups: u32,
}
impl Storage {
	pub fn resolved_backup_dir(&self) -> PathBuf {
		match self.backup_dir.as_ref() {
			Some(dir) => dir.clone(),
			None => self
				.snapshot_path
				.parent()
				.map(|parent| parent.join("backups"))
				.unwrap_or_else(|| PathBuf::from("backups")),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_extractor: LlmProviderConfig,
	#[serde(default)]
	pub rerank: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Empty means no credentials; the semantic path then reports the backend as unavailable.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
impl Default for ProviderConfig {
	fn default() -> Self {
		Self {
			provider_id: "none".to_string(),
			api_base: String::new(),
			api_key: String::new(),
			path: String::new(),
			model: String::new(),
			timeout_ms: 10_000,
			default_headers: Map::new(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	pub enrichment_ttl_secs: u64,
	pub profile_ttl_secs: u64,
	pub search_ttl_secs: u64,
	/// Soft ceiling on live keys; the optimizer trims above it.
	pub soft_max_keys: usize,
	/// Share of the oldest entries dropped when the ceiling is exceeded.
	pub evict_fraction: f32,
	pub optimize_interval_secs: u64,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			enabled: true,
			enrichment_ttl_secs: 600,
			profile_ttl_secs: 1_800,
			search_ttl_secs: 300,
			soft_max_keys: 1_000,
			evict_fraction: 0.2,
			optimize_interval_secs: 300,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Enrichment {
	/// Ask the extractor provider first; rule-based extraction is always the fallback.
	pub ai_extraction: bool,
	pub max_entities: usize,
	pub base_importance: f32,
}
impl Default for Enrichment {
	fn default() -> Self {
		Self { ai_extraction: true, max_entities: 10, base_importance: 3.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Chunking {
	pub max_words: u32,
	pub overlap_words: u32,
}
impl Default for Chunking {
	fn default() -> Self {
		Self { max_words: 250, overlap_words: 25 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Dedup {
	pub jaccard_threshold: f32,
}
impl Default for Dedup {
	fn default() -> Self {
		Self { jaccard_threshold: 0.95 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub max_limit: u32,
	pub overfetch_factor: u32,
	/// Cross references attached to each returned result.
	pub related_chunks: usize,
	pub excerpt_chars: usize,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: 5,
			max_limit: 50,
			overfetch_factor: 5,
			related_chunks: 3,
			excerpt_chars: 160,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub project_boost: f32,
	pub theme_weight: f32,
	pub character_weight: f32,
	pub importance_weight: f32,
	pub content_type_boost: f32,
	pub rerank: RankingRerank,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			project_boost: 1.8,
			theme_weight: 0.3,
			character_weight: 0.4,
			importance_weight: 0.1,
			content_type_boost: 1.5,
			rerank: RankingRerank::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RankingRerank {
	pub enabled: bool,
	pub weight: f32,
	pub max_candidates: u32,
}
impl Default for RankingRerank {
	fn default() -> Self {
		Self { enabled: false, weight: 0.5, max_candidates: 20 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Profiles {
	pub max_characters: usize,
	pub max_themes: usize,
	pub max_plot_points: usize,
	pub max_settings: usize,
}
impl Default for Profiles {
	fn default() -> Self {
		Self { max_characters: 20, max_themes: 10, max_plot_points: 20, max_settings: 10 }
	}
}

fn default_max_backups() -> u32 {
	5
}
