//! # Archive Classifier
//!
//! Threshold check followed by historical-depth verification.

use tracing::debug;

use crate::algorithms::{plan_historical_probes, HistoricalProbe};
use crate::config::DiscoveryConfig;
use crate::domain::HistoricalOutcome;
use crate::ports::ChainClient;

/// Decides whether a connected node is an archive node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveClassifier {
    archive_threshold: u64,
    verify_historical_depth: bool,
}

impl ArchiveClassifier {
    /// Classifier using the policy of `config`.
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            archive_threshold: config.archive_threshold,
            verify_historical_depth: config.verify_historical_depth,
        }
    }

    /// Classify a node reporting `block_height`.
    ///
    /// `recent_heights` is the confirmed-archive sample feeding the adaptive
    /// probe. A failed historical probe is a non-archive verdict, not an
    /// error; the reason is carried in the outcome.
    pub async fn classify(
        &self,
        block_height: u64,
        recent_heights: &[u64],
        client: &mut dyn ChainClient,
    ) -> (bool, HistoricalOutcome) {
        if block_height < self.archive_threshold {
            return (false, HistoricalOutcome::passed());
        }
        if !self.verify_historical_depth {
            return (true, HistoricalOutcome::passed());
        }

        for probe in plan_historical_probes(block_height, recent_heights) {
            if let Err(reason) = run_probe(probe, client).await {
                debug!(
                    endpoint = client.endpoint(),
                    %reason,
                    "[archive-discovery] historical probe failed"
                );
                return (false, HistoricalOutcome::failed(reason));
            }
        }

        (true, HistoricalOutcome::passed())
    }
}

async fn run_probe(probe: HistoricalProbe, client: &mut dyn ChainClient) -> Result<(), String> {
    let describe = |detail: String| {
        format!(
            "{} probe at height {} failed: {}",
            probe.kind, probe.target_height, detail
        )
    };

    match client.block_at(probe.target_height).await {
        Ok(Some(block)) => {
            debug!(
                kind = %probe.kind,
                height = block.height,
                hash = block.hash.as_deref().unwrap_or("-"),
                "[archive-discovery] historical block present"
            );
            Ok(())
        }
        Ok(None) => Err(describe("block not found".to_string())),
        Err(e) => Err(describe(e.to_string())),
    }
}
