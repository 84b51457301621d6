use crate::dependencies::DependencyResolver;
use crate::version::GemVersion;
use std::fmt;

/// Half-open range `[lo, hi)` of gem versions. `hi = None` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lo: GemVersion,
    hi: Option<GemVersion>,
}

impl VersionRange {
    pub fn new(lo: GemVersion, hi: Option<GemVersion>) -> Self {
        Self { lo, hi }
    }

    /// Range over version literals known when the binary is built.
    pub(crate) fn literal(lo: &str, hi: Option<&str>) -> Self {
        let parse = |s: &str| GemVersion::parse(s).expect("literal version range bound");
        Self::new(parse(lo), hi.map(parse))
    }

    pub fn lo(&self) -> &GemVersion {
        &self.lo
    }

    pub fn hi(&self) -> Option<&GemVersion> {
        self.hi.as_ref()
    }

    pub fn contains(&self, version: &GemVersion) -> bool {
        *version >= self.lo && self.hi.as_ref().map_or(true, |hi| version < hi)
    }

    pub fn overlaps(&self, other: &VersionRange) -> bool {
        let below = |a: &VersionRange, b: &VersionRange| a.hi.as_ref().is_some_and(|hi| *hi <= b.lo);
        !below(self, other) && !below(other, self)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hi {
            Some(hi) => write!(f, "[{}, {})", self.lo, hi),
            None => write!(f, "[{}, ∞)", self.lo),
        }
    }
}

/// Predicate deciding whether a strategy applies to the resolved dependencies.
#[derive(Debug, Clone)]
pub enum CapabilityProbe {
    /// No `Gemfile.lock` was checked in.
    LockfileAbsent,
    /// The gem resolves to a version inside the range.
    GemInRange {
        gem: &'static str,
        range: VersionRange,
    },
    /// The gem is resolved, whatever its version.
    GemPresent(&'static str),
    /// Matches everything. Only valid as the last candidate.
    Always,
}

impl CapabilityProbe {
    pub fn gem_in_range(gem: &'static str, lo: &str, hi: Option<&str>) -> Self {
        Self::GemInRange {
            gem,
            range: VersionRange::literal(lo, hi),
        }
    }

    pub fn matches(&self, deps: &dyn DependencyResolver) -> bool {
        match self {
            Self::LockfileAbsent => !deps.has_lockfile(),
            Self::GemInRange { gem, range } => deps
                .gem_version(gem)
                .is_some_and(|version| range.contains(&version)),
            Self::GemPresent(gem) => deps.has_gem(gem),
            Self::Always => true,
        }
    }

    /// Gem name and range for version-range probes.
    pub fn version_range(&self) -> Option<(&'static str, &VersionRange)> {
        match self {
            Self::GemInRange { gem, range } => Some((*gem, range)),
            _ => None,
        }
    }
}

impl fmt::Display for CapabilityProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockfileAbsent => write!(f, "Gemfile.lock absent"),
            Self::GemInRange { gem, range } => write!(f, "{} in {}", gem, range),
            Self::GemPresent(gem) => write!(f, "{} present", gem),
            Self::Always => write!(f, "always"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::ResolvedDependencies;

    fn v(s: &str) -> GemVersion {
        GemVersion::parse(s).unwrap()
    }

    #[test]
    fn test_range_is_half_open() {
        let range = VersionRange::literal("6.0.0.alpha", Some("7.0.0.alpha"));
        assert!(range.contains(&v("6.0.0.alpha")));
        assert!(range.contains(&v("6.0.0.beta3")));
        assert!(range.contains(&v("6.1.7.6")));
        assert!(!range.contains(&v("7.0.0.alpha")));
        assert!(!range.contains(&v("7.0.0")));
        assert!(!range.contains(&v("5.2.8")));
    }

    #[test]
    fn test_unbounded_range() {
        let range = VersionRange::literal("8.0.0.alpha", None);
        assert!(range.contains(&v("8.0.1")));
        assert!(range.contains(&v("12.0")));
        assert!(!range.contains(&v("7.2.2")));
        assert_eq!(range.to_string(), "[8.0.0.alpha, ∞)");
    }

    #[test]
    fn test_overlaps() {
        let rails6 = VersionRange::literal("6.0.0.alpha", Some("7.0.0.alpha"));
        let rails7 = VersionRange::literal("7.0.0.alpha", Some("8.0.0.alpha"));
        let wide = VersionRange::literal("6.5", None);

        assert!(!rails6.overlaps(&rails7));
        assert!(!rails7.overlaps(&rails6));
        assert!(wide.overlaps(&rails6));
        assert!(wide.overlaps(&rails7));
    }

    #[test]
    fn test_probe_matches() {
        let deps = ResolvedDependencies::empty_lockfile()
            .with_gem("railties", "6.1.0")
            .with_gem("rack", "2.2.8");

        assert!(CapabilityProbe::gem_in_range("railties", "6.0.0.alpha", Some("7.0.0.alpha"))
            .matches(&deps));
        assert!(!CapabilityProbe::gem_in_range("railties", "5.0.0.alpha", Some("6.0.0.alpha"))
            .matches(&deps));
        assert!(CapabilityProbe::GemPresent("rack").matches(&deps));
        assert!(!CapabilityProbe::GemPresent("sinatra").matches(&deps));
        assert!(!CapabilityProbe::LockfileAbsent.matches(&deps));
        assert!(CapabilityProbe::LockfileAbsent.matches(&ResolvedDependencies::without_lockfile()));
        assert!(CapabilityProbe::Always.matches(&deps));
    }

    #[test]
    fn test_range_probe_ignores_missing_gem() {
        let deps = ResolvedDependencies::empty_lockfile();
        assert!(!CapabilityProbe::gem_in_range("railties", "3.0.0.alpha", None).matches(&deps));
    }
}
