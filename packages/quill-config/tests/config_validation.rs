use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::{Table, Value};

use quill_config::Error;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Table = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = &mut root;

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let mut path = env::temp_dir();

	path.push(format!("quill_config_test_{nanos}_{}_{ordinal}.toml", std::process::id()));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn expect_validation(payload: String, expected: &str) {
	let err = quill_config::parse(&payload).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads_from_disk() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML.to_string());
	let result = quill_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Sample config should be valid.");

	assert_eq!(cfg.search.default_limit, 5);
	assert_eq!(cfg.profiles.max_characters, 20);
	assert!((cfg.ranking.project_boost - 1.8).abs() < f32::EPSILON);
	assert!(cfg.providers.rerank.api_key.is_empty());
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("quill_config_missing_file.toml");
	let err = quill_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
	assert!(err.to_string().contains("quill_config_missing_file.toml"));
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let mut root: Table = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");

	for section in ["cache", "enrichment", "chunking", "dedup", "search", "ranking", "profiles"] {
		root.remove(section);
	}

	let cfg = quill_config::parse(&toml::to_string(&root).expect("Failed to render config."))
		.expect("Defaults should validate.");

	assert_eq!(cfg.cache.profile_ttl_secs, 1_800);
	assert_eq!(cfg.search.overfetch_factor, 5);
	assert!((cfg.dedup.jaccard_threshold - 0.95).abs() < f32::EPSILON);
	assert!(!cfg.ranking.rerank.enabled);
}

#[test]
fn backup_dir_defaults_next_to_snapshot() {
	let cfg = quill_config::parse(SAMPLE_CONFIG_TOML).expect("Sample config should be valid.");

	assert_eq!(cfg.storage.resolved_backup_dir(), PathBuf::from("var/quill/backups"));
}

#[test]
fn api_keys_are_trimmed() {
	let payload = sample_with("providers.embedding", "api_key", Value::String("   ".to_string()));
	let cfg = quill_config::parse(&payload).expect("Blank keys are allowed.");

	assert!(cfg.providers.embedding.api_key.is_empty());
}

#[test]
fn embedding_dimensions_must_be_positive() {
	expect_validation(
		sample_with("providers.embedding", "dimensions", Value::Integer(0)),
		"providers.embedding.dimensions must be greater than zero.",
	);
}

#[test]
fn provider_timeouts_must_be_positive() {
	expect_validation(
		sample_with("providers.llm_extractor", "timeout_ms", Value::Integer(0)),
		"providers.llm_extractor.timeout_ms must be greater than zero.",
	);
}

#[test]
fn jaccard_threshold_must_be_a_ratio() {
	expect_validation(
		sample_with("dedup", "jaccard_threshold", Value::Float(1.5)),
		"dedup.jaccard_threshold must be in the range 0.0-1.0.",
	);
}

#[test]
fn overlap_must_be_less_than_chunk_size() {
	expect_validation(
		sample_with("chunking", "overlap_words", Value::Integer(250)),
		"chunking.overlap_words must be less than chunking.max_words.",
	);
}

#[test]
fn evict_fraction_must_be_in_range() {
	expect_validation(
		sample_with("cache", "evict_fraction", Value::Float(0.0)),
		"cache.evict_fraction must be in the range (0.0, 1.0].",
	);
}

#[test]
fn cache_ttls_must_be_positive_when_enabled() {
	expect_validation(
		sample_with("cache", "search_ttl_secs", Value::Integer(0)),
		"cache.search_ttl_secs must be greater than zero when the cache is enabled.",
	);
}

#[test]
fn default_limit_cannot_exceed_max_limit() {
	expect_validation(
		sample_with("search", "default_limit", Value::Integer(80)),
		"search.default_limit must be less than or equal to search.max_limit.",
	);
}

#[test]
fn ranking_weights_must_be_non_negative() {
	expect_validation(
		sample_with("ranking", "theme_weight", Value::Float(-0.1)),
		"ranking.theme_weight must be zero or greater.",
	);
}

#[test]
fn importance_weight_keeps_factor_positive() {
	expect_validation(
		sample_with("ranking", "importance_weight", Value::Float(0.3)),
		"ranking.importance_weight must be less than 0.25.",
	);
}

#[test]
fn profile_caps_must_be_positive() {
	expect_validation(
		sample_with("profiles", "max_themes", Value::Integer(0)),
		"profiles.max_themes must be greater than zero.",
	);
}
