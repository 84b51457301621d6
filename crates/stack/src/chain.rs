use crate::dependencies::DependencyResolver;
use crate::probe::CapabilityProbe;
use crate::StrategyId;
use rubypack_core::{BuildError, BuildResult};
use std::path::Path;
use tracing::{debug, info};

/// A strategy together with the probe that selects it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: StrategyId,
    pub probe: CapabilityProbe,
}

impl Candidate {
    pub fn new(id: StrategyId, probe: CapabilityProbe) -> Self {
        Self { id, probe }
    }
}

/// Ordered candidates; the first whose probe matches wins.
#[derive(Debug, Clone)]
pub struct StrategyChain {
    candidates: Vec<Candidate>,
}

impl StrategyChain {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Lockfile check first, then Rails from newest to oldest, then Rack, then plain Ruby.
    pub fn with_defaults() -> Self {
        use CapabilityProbe as P;
        use StrategyId as S;

        Self::new(vec![
            Candidate::new(S::NoLockfile, P::LockfileAbsent),
            Candidate::new(S::Rails8, P::gem_in_range("railties", "8.0.0.alpha", None)),
            Candidate::new(
                S::Rails7,
                P::gem_in_range("railties", "7.0.0.alpha", Some("8.0.0.alpha")),
            ),
            Candidate::new(
                S::Rails6,
                P::gem_in_range("railties", "6.0.0.alpha", Some("7.0.0.alpha")),
            ),
            Candidate::new(
                S::Rails5,
                P::gem_in_range("railties", "5.0.0.alpha", Some("6.0.0.alpha")),
            ),
            Candidate::new(
                S::Rails42,
                P::gem_in_range("railties", "4.2.0.alpha", Some("5.0.0.alpha")),
            ),
            Candidate::new(
                S::Rails41,
                P::gem_in_range("railties", "4.1.0.alpha", Some("4.2.0.alpha")),
            ),
            Candidate::new(
                S::Rails4,
                P::gem_in_range("railties", "4.0.0.alpha", Some("4.1.0.alpha")),
            ),
            Candidate::new(
                S::Rails3,
                P::gem_in_range("railties", "3.0.0.alpha", Some("4.0.0.alpha")),
            ),
            Candidate::new(S::Rails2, P::gem_in_range("rails", "2.0.0", Some("3.0.0"))),
            Candidate::new(S::Rack, P::GemPresent("rack")),
            Candidate::new(S::Ruby, P::Always),
        ])
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// First matching strategy. Later probes are never evaluated.
    pub fn detect(&self, deps: &dyn DependencyResolver) -> Option<StrategyId> {
        for candidate in &self.candidates {
            if candidate.probe.matches(deps) {
                debug!("Strategy {} matched ({})", candidate.id, candidate.probe);
                return Some(candidate.id);
            }
            debug!("Strategy {} skipped ({})", candidate.id, candidate.probe);
        }
        None
    }

    /// Like [`detect`](Self::detect), but a missing match is an error.
    pub fn select(&self, deps: &dyn DependencyResolver, app_dir: &Path) -> BuildResult<StrategyId> {
        match self.detect(deps) {
            Some(id) => {
                info!("Detected {} application ({})", id.label(), id);
                Ok(id)
            }
            None => Err(BuildError::NoApplicableStrategy {
                app_dir: app_dir.to_path_buf(),
            }),
        }
    }

    /// Pairs of candidates probing the same gem with intersecting ranges.
    pub fn overlapping_ranges(&self) -> Vec<(StrategyId, StrategyId)> {
        let ranges: Vec<_> = self
            .candidates
            .iter()
            .filter_map(|c| c.probe.version_range().map(|(gem, range)| (c.id, gem, range)))
            .collect();

        let mut overlaps = Vec::new();
        for (i, (id_a, gem_a, range_a)) in ranges.iter().enumerate() {
            for (id_b, gem_b, range_b) in &ranges[i + 1..] {
                if gem_a == gem_b && range_a.overlaps(range_b) {
                    overlaps.push((*id_a, *id_b));
                }
            }
        }
        overlaps
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::with_defaults()
    }
}
