//! Completing a source config against the live upstream.
//!
//! When the operator leaves `flavor` empty or `server-id` at 0, the
//! [`Adjuster`] asks the upstream for the missing facts:
//!
//! 1. the server flavor (`mysql` or `mariadb`)
//! 2. a server id no other replication client of the upstream is using
//! 3. whether `GTID_MODE` is `ON`, if GTID tracking is enabled
//!
//! Values set by the operator are never overwritten, so running discovery
//! again on a completed config issues no flavor or server-id query.
//!
//! All queries share a single deadline, so the total time spent waiting on
//! the upstream is bounded no matter how many steps run.
//!
//! Picking a server id races with other workers choosing ids against the
//! same upstream at the same time. The candidate range is wide enough that
//! this is accepted without any distributed lock.

use crate::error::{DiscoveryError, DiscoveryStep};
use crate::model::{Flavor, SourceConfig};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default bound on the whole discovery sequence.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Lowest generated server id. Manually assigned ids are conventionally small.
pub const DEFAULT_BASE_SERVER_ID: u32 = u32::MAX / 10;

/// Generated ids fall in `[DEFAULT_BASE_SERVER_ID, DEFAULT_BASE_SERVER_ID + SERVER_ID_RANGE)`.
pub const SERVER_ID_RANGE: u32 = 100_000;

/// Candidates tried before giving up on finding a free server id.
pub const SERVER_ID_ATTEMPTS: usize = 5;

// Deadline used when `now + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Value of `GTID_MODE` when GTID replication is enabled.
pub const GTID_MODE_ON: &str = "ON";

/// Queries the discovery protocol needs from the upstream.
#[async_trait]
pub trait UpstreamProbe: Send + Sync {
    /// The server's flavor as reported by the upstream.
    async fn reported_dialect(&self) -> anyhow::Result<String>;

    /// Server ids of every replication client currently connected to the
    /// upstream, plus the upstream's own id.
    async fn connected_server_ids(&self) -> anyhow::Result<HashSet<u32>>;

    /// Current value of the `GTID_MODE` variable.
    async fn gtid_mode_status(&self) -> anyhow::Result<String>;
}

#[async_trait]
impl<P: UpstreamProbe + ?Sized> UpstreamProbe for &P {
    async fn reported_dialect(&self) -> anyhow::Result<String> {
        (**self).reported_dialect().await
    }

    async fn connected_server_ids(&self) -> anyhow::Result<HashSet<u32>> {
        (**self).connected_server_ids().await
    }

    async fn gtid_mode_status(&self) -> anyhow::Result<String> {
        (**self).gtid_mode_status().await
    }
}

/// Source of random offsets for server id candidates.
pub trait ServerIdCandidates: Send {
    /// Next offset. Values outside `[0, SERVER_ID_RANGE)` are wrapped into it.
    fn next_offset(&mut self) -> u32;
}

/// Candidate offsets drawn uniformly from an [`Rng`].
pub struct RandomCandidates<R>(pub R);

impl<R: Rng + Send> ServerIdCandidates for RandomCandidates<R> {
    fn next_offset(&mut self) -> u32 {
        self.0.random_range(0..SERVER_ID_RANGE)
    }
}

/// Fills unset `flavor` and `server-id` from the upstream and checks GTID mode.
pub struct Adjuster<P, C> {
    probe: P,
    candidates: C,
    timeout: Duration,
}

impl<P: UpstreamProbe> Adjuster<P, RandomCandidates<rand::rngs::StdRng>> {
    /// Adjuster using a freshly seeded random generator for server ids.
    pub fn new(probe: P) -> Self {
        use rand::SeedableRng;
        Self::with_candidates(probe, RandomCandidates(rand::rngs::StdRng::from_os_rng()))
    }
}

impl<P: UpstreamProbe, C: ServerIdCandidates> Adjuster<P, C> {
    pub fn with_candidates(probe: P, candidates: C) -> Self {
        Self {
            probe,
            candidates,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    /// Bound the whole discovery sequence by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Complete `cfg` against the upstream.
    pub async fn adjust(&mut self, cfg: &mut SourceConfig) -> Result<(), DiscoveryError> {
        cfg.adjust_structure();
        let now = Instant::now();
        let deadline = now
            .checked_add(self.timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);

        if cfg.flavor.is_empty() || cfg.server_id == 0 {
            self.adjust_flavor(cfg, deadline).await?;
            self.adjust_server_id(cfg, deadline).await?;
        }

        if cfg.enable_gtid {
            self.check_gtid_mode(cfg, deadline).await?;
        }

        Ok(())
    }

    /// Validate a configured flavor, or ask the upstream for it.
    pub async fn adjust_flavor(
        &mut self,
        cfg: &mut SourceConfig,
        deadline: Instant,
    ) -> Result<(), DiscoveryError> {
        if !cfg.flavor.is_empty() {
            return match cfg.parsed_flavor() {
                Some(_) => Ok(()),
                None => Err(DiscoveryError::UnsupportedFlavor(cfg.flavor.clone())),
            };
        }

        let reported = self
            .query(DiscoveryStep::Flavor, deadline, self.probe.reported_dialect())
            .await?;
        let flavor: Flavor = reported
            .parse()
            .map_err(|_| DiscoveryError::UnsupportedFlavor(reported.clone()))?;

        info!(source_id = %cfg.source_id, %flavor, "Discovered upstream flavor");
        cfg.flavor = flavor.to_string();
        Ok(())
    }

    /// Pick a server id unused on the upstream, unless one is configured.
    pub async fn adjust_server_id(
        &mut self,
        cfg: &mut SourceConfig,
        deadline: Instant,
    ) -> Result<(), DiscoveryError> {
        if cfg.server_id != 0 {
            return Ok(());
        }

        let server_ids = self
            .query(
                DiscoveryStep::ServerIds,
                deadline,
                self.probe.connected_server_ids(),
            )
            .await?;

        for attempt in 1..=SERVER_ID_ATTEMPTS {
            let offset = self.candidates.next_offset() % SERVER_ID_RANGE;
            let candidate = DEFAULT_BASE_SERVER_ID + offset;
            if server_ids.contains(&candidate) {
                debug!(candidate, attempt, "Server id already in use upstream");
                continue;
            }

            info!(source_id = %cfg.source_id, server_id = candidate, "Generated server id");
            cfg.server_id = candidate;
            return Ok(());
        }

        Err(DiscoveryError::ServerIdExhausted {
            attempts: SERVER_ID_ATTEMPTS,
        })
    }

    /// Require `GTID_MODE=ON` upstream. `auto-fix-gtid` does not apply here.
    pub async fn check_gtid_mode(
        &mut self,
        cfg: &SourceConfig,
        deadline: Instant,
    ) -> Result<(), DiscoveryError> {
        let value = self
            .query(DiscoveryStep::GtidMode, deadline, self.probe.gtid_mode_status())
            .await?;
        if value != GTID_MODE_ON {
            return Err(DiscoveryError::GtidModeMismatch {
                source_id: cfg.source_id.clone(),
                value,
            });
        }
        Ok(())
    }

    async fn query<T>(
        &self,
        step: DiscoveryStep,
        deadline: Instant,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, DiscoveryError> {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(DiscoveryError::Upstream { step, source }),
            Err(_) => Err(DiscoveryError::UpstreamTimeout {
                step,
                bound: self.timeout,
            }),
        }
    }
}
