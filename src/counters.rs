// ABOUTME: Counter store abstraction for rate-limit windows
// ABOUTME: Atomic increment-with-expiry over Redis or an in-process map
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Rate-Limit Counter Stores
//!
//! The rate limiter needs exactly two operations from its backing store:
//! an atomic increment that pins a TTL when the key is first created, and a
//! plain read. Window buckets are encoded in the key, so counters never need
//! to be reset; they age out with their TTL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::errors::AppResult;

/// Backing store for rate-limit counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key`, setting `ttl` when the key is created,
    /// and return the post-increment count
    async fn increment(&self, key: &str, ttl: Duration) -> AppResult<u64>;

    /// Current count for `key`, zero when absent or expired
    async fn get(&self, key: &str) -> AppResult<u64>;
}

/// Redis-backed counter store for multi-node deployments
///
/// Increment and expiry run in one atomic pipeline; `EXPIRE NX` leaves an
/// existing TTL untouched so repeated increments never extend a window.
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to Redis and build the store
    ///
    /// # Errors
    ///
    /// Returns an error when the connection cannot be established.
    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> AppResult<u64> {
        let mut conn = self.manager.clone();
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs())
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> AppResult<u64> {
        let mut conn = self.manager.clone();
        let count: Option<u64> = conn.get(key).await?;
        Ok(count.unwrap_or(0))
    }
}

struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// In-process counter store for single-node deployments and tests
///
/// Expiry is checked lazily: a counter past its TTL reads as zero and is
/// restarted by the next increment.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, CounterEntry>,
}

impl MemoryCounterStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> AppResult<u64> {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_owned())
            .or_insert_with(|| CounterEntry {
                count: 0,
                expires_at: now + ttl,
            });
        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + ttl;
        }
        entry.count += 1;
        Ok(entry.count)
    }

    async fn get(&self, key: &str) -> AppResult<u64> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map_or(0, |entry| entry.count))
    }
}
