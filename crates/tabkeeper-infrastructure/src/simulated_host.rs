//! Host stand-in used when no native tab host is attached.
//!
//! Produces plausible, randomized resource samples and reports that
//! notifications and picture-in-picture are unavailable, so the engine can run
//! in a reduced mode for demos and tests.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Mutex;

use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::host::{HostCapabilities, HostKind, HostResourceSample, VideoHandle};

const SIMULATED_TOTAL_MEMORY_MB: f64 = 16_384.0;
const BROWSER_OVERHEAD_MB: f64 = 500.0;

pub struct SimulatedHost {
    rng: Mutex<StdRng>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic samples, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn simulate(&self, tab_ids: &[String]) -> Result<HostResourceSample> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| TabkeeperError::internal("simulated host rng poisoned"))?;

        let tab_memory_mb: BTreeMap<String, f64> = tab_ids
            .iter()
            .map(|id| (id.clone(), rng.gen_range(40.0..420.0_f64).round()))
            .collect();
        let tabs_total: f64 = tab_memory_mb.values().sum();

        Ok(HostResourceSample {
            cpu_percent: rng.gen_range(2.0..45.0_f64),
            memory_used_mb: (tabs_total + BROWSER_OVERHEAD_MB).min(SIMULATED_TOTAL_MEMORY_MB),
            memory_total_mb: SIMULATED_TOTAL_MEMORY_MB,
            network_in_kbps: rng.gen_range(0.0..2_000.0_f64),
            network_out_kbps: rng.gen_range(0.0..300.0_f64),
            tab_count: tab_ids.len(),
            tab_memory_mb,
        })
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostCapabilities for SimulatedHost {
    fn kind(&self) -> HostKind {
        HostKind::Simulated
    }

    async fn sample_resources(&self, tab_ids: &[String]) -> Result<HostResourceSample> {
        self.simulate(tab_ids)
    }

    fn notifications_available(&self) -> bool {
        false
    }

    fn picture_in_picture_available(&self) -> bool {
        false
    }

    async fn enter_picture_in_picture(&self, _handle: &VideoHandle) -> Result<()> {
        Err(TabkeeperError::unsupported(
            "picture-in-picture is not available in simulation",
        ))
    }

    async fn exit_picture_in_picture(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sample_covers_every_tab() {
        let host = SimulatedHost::with_seed(7);
        let tabs = vec!["a".to_string(), "b".to_string()];
        let sample = host.sample_resources(&tabs).await.unwrap();

        assert_eq!(sample.tab_count, 2);
        assert_eq!(sample.tab_memory_mb.len(), 2);
        assert!(sample.memory_used_mb >= BROWSER_OVERHEAD_MB);
        assert!(sample.cpu_percent < 45.0);
    }

    #[tokio::test]
    async fn test_seeded_hosts_agree() {
        let tabs = vec!["a".to_string()];
        let first = SimulatedHost::with_seed(42).sample_resources(&tabs).await.unwrap();
        let second = SimulatedHost::with_seed(42).sample_resources(&tabs).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_picture_in_picture_unsupported() {
        let host = SimulatedHost::new();
        assert_eq!(host.kind(), HostKind::Simulated);
        let handle = VideoHandle {
            element_id: "v".into(),
            video_url: "https://video.example/a.mp4".into(),
            bounds: Default::default(),
        };
        let err = host.enter_picture_in_picture(&handle).await.unwrap_err();
        assert!(err.is_unsupported());
    }
}
