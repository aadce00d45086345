use std::{
	collections::{HashMap, VecDeque},
	sync::{Arc, Mutex, MutexGuard},
	time::Duration,
};

use serde_json::Value;
use tokio::time::Instant;

use sentio_domain::{knowledge::KnowledgeSnippet, statistics::UserStatistics};

use crate::{
	BoxFuture, Error, Result,
	knowledge::{RetrievalRequest, Retrieve},
	statistics::StatisticsSource,
};

const CACHE_KEY_SCHEMA_VERSION: i32 = 1;

/// Deterministic fingerprint of an operation and its parameters.
pub fn cache_key(operation: &str, params: &Value) -> Result<String> {
	let payload = serde_json::json!({
		"kind": operation,
		"schema_version": CACHE_KEY_SCHEMA_VERSION,
		"params": params,
	});
	let raw = serde_json::to_vec(&payload).map_err(|err| Error::CacheCorruption {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

pub fn cache_key_prefix(key: &str) -> &str {
	let len = key.len().min(12);

	&key[..len]
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
	pub value: V,
	pub inserted_at: Instant,
	pub ttl: Duration,
}
impl<V> CacheEntry<V> {
	fn is_expired(&self, now: Instant) -> bool {
		now.duration_since(self.inserted_at) >= self.ttl
	}
}

/// TTL cache with a hard capacity.
///
/// Over capacity, the oldest-inserted entry is evicted; reads do not refresh an entry's position.
/// Concurrent misses for the same key are not coalesced.
pub struct ResultCache<V> {
	ttl: Duration,
	capacity: usize,
	state: Mutex<CacheState<V>>,
}

struct CacheState<V> {
	entries: HashMap<String, CacheEntry<V>>,
	insertion_order: VecDeque<String>,
	// Bumped by every `invalidate_all`.
	generation: u64,
}
impl<V> CacheState<V> {
	fn forget(&mut self, key: &str) {
		self.entries.remove(key);
		self.insertion_order.retain(|queued| queued != key);
	}

	fn insert(&mut self, key: String, entry: CacheEntry<V>, capacity: usize) -> Result<()> {
		if self.entries.contains_key(&key) {
			self.forget(&key);
		}

		self.insertion_order.push_back(key.clone());
		self.entries.insert(key, entry);

		while self.entries.len() > capacity {
			let Some(oldest) = self.insertion_order.pop_front() else {
				return Err(Error::CacheCorruption {
					message: "Insertion order is empty while entries exceed capacity.".to_string(),
				});
			};

			if self.entries.remove(&oldest).is_some() {
				tracing::debug!(cache_key_prefix = cache_key_prefix(&oldest), "Cache entry evicted.");
			}
		}

		if self.entries.len() != self.insertion_order.len() {
			return Err(Error::CacheCorruption {
				message: "Cache entries and insertion order diverged.".to_string(),
			});
		}

		Ok(())
	}
}

impl<V> ResultCache<V>
where
	V: Clone,
{
	pub fn new(ttl: Duration, capacity: usize) -> Self {
		Self {
			ttl,
			capacity: capacity.max(1),
			state: Mutex::new(CacheState {
				entries: HashMap::new(),
				insertion_order: VecDeque::new(),
				generation: 0,
			}),
		}
	}

	/// Returns the live value for `key`. An expired entry is purged and reported absent.
	pub fn get(&self, key: &str) -> Option<V> {
		let mut state = self.lock();
		let now = Instant::now();
		let expired = state.entries.get(key)?.is_expired(now);

		if expired {
			state.forget(key);

			tracing::debug!(cache_key_prefix = cache_key_prefix(key), "Cache entry expired.");

			return None;
		}

		state.entries.get(key).map(|entry| entry.value.clone())
	}

	pub fn put(&self, key: String, value: V) -> Result<()> {
		let entry = self.entry(value);

		self.lock().insert(key, entry, self.capacity)
	}

	/// Stores `value` only if no invalidation happened since `generation` was read.
	///
	/// Returns `Ok(false)` when the write was dropped as stale.
	pub fn put_if_current(&self, key: String, value: V, generation: u64) -> Result<bool> {
		let entry = self.entry(value);
		let mut state = self.lock();

		if state.generation != generation {
			tracing::debug!(
				cache_key_prefix = cache_key_prefix(&key),
				"Dropping cache write computed before invalidation."
			);

			return Ok(false);
		}

		state.insert(key, entry, self.capacity)?;

		Ok(true)
	}

	pub fn generation(&self) -> u64 {
		self.lock().generation
	}

	pub fn invalidate_all(&self) {
		let mut state = self.lock();

		state.entries.clear();
		state.insertion_order.clear();
		state.generation = state.generation.wrapping_add(1);
	}

	pub fn len(&self) -> usize {
		self.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn entry(&self, value: V) -> CacheEntry<V> {
		CacheEntry { value, inserted_at: Instant::now(), ttl: self.ttl }
	}

	fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}

/// Wraps a call-contract implementation with a [`ResultCache`], preserving the contract.
pub struct Cached<T, V> {
	inner: T,
	cache: Arc<ResultCache<V>>,
}
impl<T, V> Cached<T, V>
where
	V: Clone,
{
	pub fn new(inner: T, cache: Arc<ResultCache<V>>) -> Self {
		Self { inner, cache }
	}

	fn lookup(&self, operation: &str, key: &str) -> Option<V> {
		let hit = self.cache.get(key);

		tracing::debug!(
			operation,
			cache_key_prefix = cache_key_prefix(key),
			hit = hit.is_some(),
			"Cache lookup."
		);

		hit
	}

	fn store(&self, key: String, value: &V, generation: u64) {
		if let Err(err) = self.cache.put_if_current(key, value.clone(), generation) {
			tracing::warn!(error = %err, "Cache write failed. Resetting cache.");

			self.cache.invalidate_all();
		}
	}
}

impl<T> Retrieve for Cached<T, Vec<KnowledgeSnippet>>
where
	T: Retrieve,
{
	fn retrieve<'a>(
		&'a self,
		request: &'a RetrievalRequest,
	) -> BoxFuture<'a, Result<Vec<KnowledgeSnippet>>> {
		Box::pin(async move {
			let key = cache_key("retrieve", &request.fingerprint())?;

			if let Some(hit) = self.lookup("retrieve", &key) {
				return Ok(hit);
			}

			let generation = self.cache.generation();
			let snippets = self.inner.retrieve(request).await?;

			self.store(key, &snippets, generation);

			Ok(snippets)
		})
	}
}

impl<T> StatisticsSource for Cached<T, UserStatistics>
where
	T: StatisticsSource,
{
	fn compute_statistics<'a>(
		&'a self,
		user_id: &'a str,
		window_days: u32,
	) -> BoxFuture<'a, Result<UserStatistics>> {
		Box::pin(async move {
			let params = serde_json::json!({ "user_id": user_id, "window_days": window_days });
			let key = cache_key("statistics", &params)?;

			if let Some(hit) = self.lookup("statistics", &key) {
				return Ok(hit);
			}

			let generation = self.cache.generation();
			let stats = self.inner.compute_statistics(user_id, window_days).await?;

			self.store(key, &stats, generation);

			Ok(stats)
		})
	}
}
