//! In-process TTL cache shared by enrichment, profile reads, and search results.
//!
//! Values are stored as JSON so one cache can hold every payload kind. Expired entries are
//! dropped on read and by [`Cache::optimize`]. Inserts beyond `soft_max_keys` evict the oldest
//! entries first.

use std::{
	collections::HashMap,
	future::Future,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;

use quill_domain::Clock;

const KEY_PREFIX_LEN: usize = 24;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
	pub keys: usize,
	pub hits: u64,
	pub misses: u64,
	pub hit_rate: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeReport {
	pub expired: usize,
	pub evicted: usize,
	pub remaining: usize,
}

struct CacheEntry {
	value: Value,
	stored_at: OffsetDateTime,
	expires_at: OffsetDateTime,
}

pub struct Cache {
	enabled: bool,
	soft_max_keys: usize,
	evict_fraction: f32,
	clock: Arc<dyn Clock>,
	entries: Mutex<HashMap<String, CacheEntry>>,
	inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
	hits: AtomicU64,
	misses: AtomicU64,
}
impl Cache {
	pub fn new(cfg: &quill_config::Cache, clock: Arc<dyn Clock>) -> Self {
		Self {
			enabled: cfg.enabled,
			soft_max_keys: cfg.soft_max_keys.max(1),
			evict_fraction: cfg.evict_fraction,
			clock,
			entries: Mutex::new(HashMap::new()),
			inflight: Mutex::new(HashMap::new()),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	pub fn get<T>(&self, key: &str) -> Option<T>
	where
		T: DeserializeOwned,
	{
		let found = self.lookup(key);

		match found {
			Some(value) => {
				self.hits.fetch_add(1, Ordering::Relaxed);

				tracing::debug!(cache_key_prefix = key_prefix(key), "Cache hit.");

				Some(value)
			},
			None => {
				self.misses.fetch_add(1, Ordering::Relaxed);

				tracing::debug!(cache_key_prefix = key_prefix(key), "Cache miss.");

				None
			},
		}
	}

	pub fn set<T>(&self, key: &str, value: &T, ttl: Duration)
	where
		T: Serialize,
	{
		if !self.enabled {
			return;
		}

		let value = match serde_json::to_value(value) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = key_prefix(key),
					"Cache payload encode failed."
				);

				return;
			},
		};
		let now = self.clock.now();
		let mut entries = self.lock_entries();

		entries.insert(key.to_string(), CacheEntry { value, stored_at: now, expires_at: now + ttl });

		if entries.len() > self.soft_max_keys {
			let report = evict(&mut entries, now, self.soft_max_keys, self.evict_fraction);

			tracing::debug!(
				expired = report.expired,
				evicted = report.evicted,
				remaining = report.remaining,
				"Cache exceeded its soft key limit."
			);
		}
	}

	/// Returns the cached value or runs `producer` and stores its `Ok` result. Concurrent callers
	/// for the same key wait for the first producer instead of running their own. Errors are
	/// returned to the caller and never cached.
	pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<T, E>
	where
		T: Serialize + DeserializeOwned,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		if !self.enabled {
			self.misses.fetch_add(1, Ordering::Relaxed);

			return producer().await;
		}
		if let Some(value) = self.get(key) {
			return Ok(value);
		}

		let gate = self.inflight_gate(key);
		let guard = gate.lock().await;

		if let Some(value) = self.lookup(key) {
			drop(guard);
			self.release_gate(key, &gate);

			return Ok(value);
		}

		let produced = producer().await;

		if let Ok(value) = &produced {
			self.set(key, value, ttl);
		}

		drop(guard);
		self.release_gate(key, &gate);

		produced
	}

	pub fn delete(&self, key: &str) -> bool {
		self.lock_entries().remove(key).is_some()
	}

	/// Removes every key starting with `prefix`.
	pub fn delete_pattern(&self, prefix: &str) -> usize {
		let mut entries = self.lock_entries();
		let before = entries.len();

		entries.retain(|key, _| !key.starts_with(prefix));

		let removed = before - entries.len();

		if removed > 0 {
			tracing::debug!(prefix, removed, "Cache entries invalidated.");
		}

		removed
	}

	pub fn clear(&self) {
		self.lock_entries().clear();
	}

	pub fn stats(&self) -> CacheStats {
		let hits = self.hits.load(Ordering::Relaxed);
		let misses = self.misses.load(Ordering::Relaxed);
		let total = hits + misses;

		CacheStats {
			keys: self.lock_entries().len(),
			hits,
			misses,
			hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
		}
	}

	/// Drops expired entries, then trims to the soft key limit.
	pub fn optimize(&self) -> OptimizeReport {
		let now = self.clock.now();
		let mut entries = self.lock_entries();

		evict(&mut entries, now, self.soft_max_keys, self.evict_fraction)
	}

	pub fn spawn_optimizer(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
		let cache = Arc::downgrade(self);

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);

			ticker.tick().await;

			loop {
				ticker.tick().await;

				let Some(cache) = cache.upgrade() else {
					break;
				};
				let report = cache.optimize();

				if report.expired + report.evicted > 0 {
					tracing::info!(
						expired = report.expired,
						evicted = report.evicted,
						remaining = report.remaining,
						"Cache optimized."
					);
				}
			}
		})
	}

	fn lookup<T>(&self, key: &str) -> Option<T>
	where
		T: DeserializeOwned,
	{
		if !self.enabled {
			return None;
		}

		let now = self.clock.now();
		let mut entries = self.lock_entries();
		let entry = entries.get(key)?;

		if entry.expires_at <= now {
			entries.remove(key);

			return None;
		}

		match serde_json::from_value(entry.value.clone()) {
			Ok(value) => Some(value),
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = key_prefix(key),
					"Cache payload decode failed."
				);

				entries.remove(key);

				None
			},
		}
	}

	fn inflight_gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
		let mut inflight = self.inflight.lock().unwrap_or_else(|err| err.into_inner());

		inflight.entry(key.to_string()).or_default().clone()
	}

	fn release_gate(&self, key: &str, gate: &Arc<tokio::sync::Mutex<()>>) {
		let mut inflight = self.inflight.lock().unwrap_or_else(|err| err.into_inner());

		// Map plus the caller's clone means nobody else is waiting.
		if Arc::strong_count(gate) <= 2
			&& inflight.get(key).is_some_and(|current| Arc::ptr_eq(current, gate))
		{
			inflight.remove(key);
		}
	}

	fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner())
	}
}

pub fn hash_cache_key(namespace: &str, payload: &Value) -> String {
	let raw = payload.to_string();

	format!("{namespace}:{}", blake3::hash(raw.as_bytes()).to_hex())
}

pub fn key_prefix(key: &str) -> &str {
	let mut end = key.len().min(KEY_PREFIX_LEN);

	while !key.is_char_boundary(end) {
		end -= 1;
	}

	&key[..end]
}

fn evict(
	entries: &mut HashMap<String, CacheEntry>,
	now: OffsetDateTime,
	soft_max_keys: usize,
	evict_fraction: f32,
) -> OptimizeReport {
	let before = entries.len();

	entries.retain(|_, entry| entry.expires_at > now);

	let expired = before - entries.len();
	let mut evicted = 0;

	if entries.len() > soft_max_keys {
		let by_fraction = (entries.len() as f32 * evict_fraction).ceil() as usize;
		let target = by_fraction.max(entries.len() - soft_max_keys);
		let mut by_age: Vec<(OffsetDateTime, String)> =
			entries.iter().map(|(key, entry)| (entry.stored_at, key.clone())).collect();

		by_age.sort();

		for (_, key) in by_age.into_iter().take(target) {
			entries.remove(&key);

			evicted += 1;
		}
	}

	OptimizeReport { expired, evicted, remaining: entries.len() }
}

#[cfg(test)]
mod tests {
	use std::{
		convert::Infallible,
		sync::atomic::{AtomicUsize, Ordering},
	};

	use quill_testkit::ManualClock;

	use super::*;

	fn cache_with(clock: Arc<ManualClock>, soft_max_keys: usize) -> Cache {
		let cfg = quill_config::Cache { soft_max_keys, ..Default::default() };

		Cache::new(&cfg, clock)
	}

	#[tokio::test]
	async fn get_or_set_runs_producer_once_within_ttl() {
		let clock = Arc::new(ManualClock::default());
		let cache = cache_with(clock.clone(), 100);
		let calls = AtomicUsize::new(0);
		let produce = || async {
			calls.fetch_add(1, Ordering::SeqCst);

			Ok::<_, Infallible>("value".to_string())
		};
		let first = cache.get_or_set("k", Duration::from_secs(5), produce).await;
		let second = cache.get_or_set("k", Duration::from_secs(5), produce).await;

		assert_eq!(first, Ok("value".to_string()));
		assert_eq!(second, Ok("value".to_string()));
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		clock.advance(Duration::from_secs(6));

		let _ = cache.get_or_set("k", Duration::from_secs(5), produce).await;

		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn producer_errors_are_not_cached() {
		let cache = cache_with(Arc::new(ManualClock::default()), 100);
		let failed: Result<u32, &str> =
			cache.get_or_set("k", Duration::from_secs(5), || async { Err("boom") }).await;
		let recovered: Result<u32, &str> =
			cache.get_or_set("k", Duration::from_secs(5), || async { Ok(7) }).await;

		assert_eq!(failed, Err("boom"));
		assert_eq!(recovered, Ok(7));
	}

	#[test]
	fn delete_pattern_removes_matching_prefix_only() {
		let cache = cache_with(Arc::new(ManualClock::default()), 100);
		let ttl = Duration::from_secs(60);

		cache.set("search:P1:a", &1, ttl);
		cache.set("search:P1:b", &2, ttl);
		cache.set("search:P2:a", &3, ttl);

		assert_eq!(cache.delete_pattern("search:P1:"), 2);
		assert_eq!(cache.get::<i32>("search:P2:a"), Some(3));
		assert_eq!(cache.get::<i32>("search:P1:a"), None);
	}

	#[test]
	fn stats_track_hits_and_misses() {
		let cache = cache_with(Arc::new(ManualClock::default()), 100);

		cache.set("a", &"x", Duration::from_secs(60));

		let _ = cache.get::<String>("a");
		let _ = cache.get::<String>("missing");
		let stats = cache.stats();

		assert_eq!((stats.keys, stats.hits, stats.misses), (1, 1, 1));
		assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
	}

	#[test]
	fn inserts_beyond_soft_limit_evict_oldest() {
		let clock = Arc::new(ManualClock::default());
		let cache = cache_with(clock.clone(), 4);

		for i in 0..5 {
			cache.set(&format!("k{i}"), &i, Duration::from_secs(600));
			clock.advance(Duration::from_secs(1));
		}

		assert!(cache.stats().keys <= 4);
		assert_eq!(cache.get::<i32>("k0"), None);
		assert_eq!(cache.get::<i32>("k4"), Some(4));
	}

	#[test]
	fn optimize_drops_expired_entries() {
		let clock = Arc::new(ManualClock::default());
		let cache = cache_with(clock.clone(), 100);

		cache.set("short", &1, Duration::from_secs(1));
		cache.set("long", &2, Duration::from_secs(600));
		clock.advance(Duration::from_secs(2));

		let report = cache.optimize();

		assert_eq!(report, OptimizeReport { expired: 1, evicted: 0, remaining: 1 });
	}

	#[test]
	fn key_prefix_respects_char_boundaries() {
		assert_eq!(key_prefix("short"), "short");
		assert_eq!(key_prefix(&"é".repeat(20)).len(), 24);
	}
}
