//! Read-only lookups consulted by rules
//!
//! Rules never keep state of their own. Anything that needs history or
//! reference data (per-user frequency, IP geolocation) lives behind one of
//! these traits so a deployment can swap the placeholder for a real service.

use crate::{Error, Result, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Per-user transaction frequency check
#[async_trait]
pub trait VelocityLookup: Send + Sync {
    /// Whether the transaction's user is transacting unusually fast
    async fn is_high_velocity(&self, txn: &Transaction) -> Result<bool>;
}

/// IP geolocation vs billing location comparison
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Whether the IP's region disagrees with the billing location
    async fn is_geo_mismatch(&self, txn: &Transaction) -> Result<bool>;
}

// ===== Probabilistic placeholder =====

/// Fires with a fixed probability regardless of transaction content
///
/// Stands in for velocity and geo services that are not wired up yet.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticFlag {
    probability: f64,
}

impl ProbabilisticFlag {
    /// Create a flag that fires with `probability` (0-1)
    pub fn new(probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(Error::InvalidConfig(format!(
                "probability {} outside [0, 1]",
                probability
            )));
        }
        Ok(Self { probability })
    }

    /// Configured probability
    pub fn probability(&self) -> f64 {
        self.probability
    }

    fn fires(&self) -> bool {
        rand::thread_rng().gen_bool(self.probability)
    }
}

#[async_trait]
impl VelocityLookup for ProbabilisticFlag {
    async fn is_high_velocity(&self, _txn: &Transaction) -> Result<bool> {
        Ok(self.fires())
    }
}

#[async_trait]
impl GeoLookup for ProbabilisticFlag {
    async fn is_geo_mismatch(&self, _txn: &Transaction) -> Result<bool> {
        Ok(self.fires())
    }
}

// ===== Sliding window velocity =====

/// Sliding window velocity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityWindowConfig {
    /// Prior transactions in the window at which a user is flagged
    pub max_transactions: u32,

    /// Window length in seconds
    pub window_seconds: i64,
}

impl Default for VelocityWindowConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10,
            window_seconds: 3600,
        }
    }
}

/// In-memory per-user frequency tracker
///
/// Every checked transaction is recorded, so the tracker doubles as the
/// velocity store. Counting uses the transaction timestamps: a check at `at`
/// counts recorded transactions inside `(at - window, at]`. Retention uses
/// the server clock instead, so entries expire `window` after they were
/// recorded whatever timestamp the caller supplied. Users whose history has
/// fully expired are evicted by a periodic sweep.
pub struct SlidingWindowVelocity {
    config: VelocityWindowConfig,
    sweep_interval: u64,
    checks: AtomicU64,
    // Map: user_id -> recorded transactions
    users: Arc<DashMap<String, Vec<SeenTransaction>>>,
}

#[derive(Debug, Clone, Copy)]
struct SeenTransaction {
    at: DateTime<Utc>,
    recorded_at: DateTime<Utc>,
}

impl SlidingWindowVelocity {
    /// Checks between two sweeps of expired users
    pub const DEFAULT_SWEEP_INTERVAL: u64 = 1024;

    /// Create new tracker
    pub fn new(config: VelocityWindowConfig) -> Result<Self> {
        if config.window_seconds <= 0 {
            return Err(Error::InvalidConfig(format!(
                "velocity window must be positive, got {}s",
                config.window_seconds
            )));
        }
        Ok(Self {
            config,
            sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
            checks: AtomicU64::new(0),
            users: Arc::new(DashMap::new()),
        })
    }

    /// Sweep expired users every `interval` checks (minimum 1)
    pub fn with_sweep_interval(mut self, interval: u64) -> Self {
        self.sweep_interval = interval.max(1);
        self
    }

    /// Transactions currently recorded for a user
    pub fn recorded(&self, user_id: &str) -> usize {
        self.users.get(user_id).map(|entry| entry.len()).unwrap_or(0)
    }

    /// Number of users being tracked
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }

    /// Forget a user's history
    pub fn reset_user(&self, user_id: &str) {
        self.users.remove(user_id);
    }

    /// Drop expired entries and users left with no history
    ///
    /// Returns the number of users evicted.
    pub fn evict_expired(&self) -> usize {
        let cutoff = self.retention_cutoff(Utc::now());
        let before = self.users.len();
        self.users.retain(|_, history| {
            history.retain(|seen| seen.recorded_at > cutoff);
            !history.is_empty()
        });
        let evicted = before.saturating_sub(self.users.len());
        if evicted > 0 {
            debug!("Evicted {} idle users from velocity tracker", evicted);
        }
        evicted
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_seconds)
    }

    fn retention_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }

    fn event_time(txn: &Transaction, now: DateTime<Utc>) -> DateTime<Utc> {
        if txn.timestamp > 0.0 && txn.timestamp.is_finite() {
            let secs = txn.timestamp.trunc() as i64;
            let nanos = (txn.timestamp.fract() * 1e9) as u32;
            if let Some(at) = DateTime::<Utc>::from_timestamp(secs, nanos) {
                return at;
            }
        }
        now
    }
}

#[async_trait]
impl VelocityLookup for SlidingWindowVelocity {
    async fn is_high_velocity(&self, txn: &Transaction) -> Result<bool> {
        if txn.user_id.is_empty() {
            return Ok(false);
        }

        let now = Utc::now();
        let at = Self::event_time(txn, now);
        let window_start = at - self.window();
        let cutoff = self.retention_cutoff(now);

        let prior = {
            let mut entry = self.users.entry(txn.user_id.clone()).or_default();
            let history = entry.value_mut();
            history.retain(|seen| seen.recorded_at > cutoff);

            let prior = history
                .iter()
                .filter(|seen| seen.at > window_start && seen.at <= at)
                .count();
            history.push(SeenTransaction { at, recorded_at: now });
            prior
        };

        // Map guard must be released before sweeping
        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % self.sweep_interval == 0 {
            self.evict_expired();
        }

        Ok(prior >= self.config.max_transactions as usize)
    }
}

// ===== Static geo table =====

/// IP prefix to region table
///
/// Longest matching prefix wins. IPs with no matching prefix are treated as
/// unknown and never reported as mismatches.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoTable {
    entries: Vec<(String, String)>,
}

impl StaticGeoTable {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix mapping, e.g. `"81.2."` -> `"GB"`
    pub fn with_entry(mut self, prefix: impl Into<String>, region: impl Into<String>) -> Self {
        self.entries.push((prefix.into(), region.into()));
        self
    }

    /// Build from `(prefix, region)` pairs
    pub fn from_entries<I, P, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        entries
            .into_iter()
            .fold(Self::new(), |table, (prefix, region)| table.with_entry(prefix, region))
    }

    /// Region for an IP address, if known
    pub fn region_for(&self, ip: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|(prefix, _)| ip.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, region)| region.as_str())
    }
}

#[async_trait]
impl GeoLookup for StaticGeoTable {
    async fn is_geo_mismatch(&self, txn: &Transaction) -> Result<bool> {
        if txn.ip_address.is_empty() || txn.location.is_empty() {
            return Ok(false);
        }

        txn.ip_address
            .parse::<IpAddr>()
            .map_err(|e| Error::Lookup(format!("invalid IP {}: {}", txn.ip_address, e)))?;

        Ok(match self.region_for(&txn.ip_address) {
            Some(region) => !region.eq_ignore_ascii_case(txn.location.trim()),
            None => false,
        })
    }
}
