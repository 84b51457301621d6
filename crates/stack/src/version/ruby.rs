use regex::Regex;
use rubypack_core::{BuildError, BuildResult, Stack};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Releases up to and including this one were patched through `-pNNN` levels.
/// Later releases bump the patch component instead.
pub const LEGACY_PATCHLEVEL_THRESHOLD: (u64, u64, u64) = (2, 1, 0);

fn descriptor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^ruby-(?P<major>\d+)\.(?P<minor>\d+)\.(?P<patch>\d+)(?:-(?P<patchlevel>p-?\d+))?(?:-(?P<engine>\w+)-(?P<engine_version>.+))?$",
        )
        .expect("static regex")
    })
}

fn patchlevel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-p-?\d+").expect("static regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RubyEngine {
    Ruby,
    Jruby,
    Other(String),
}

impl RubyEngine {
    fn from_name(name: &str) -> Self {
        match name {
            "ruby" => Self::Ruby,
            "jruby" => Self::Jruby,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ruby => "ruby",
            Self::Jruby => "jruby",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for RubyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RubyEngine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A Ruby interpreter version as reported by bundler, e.g. `ruby-3.3.7`,
/// `ruby-1.9.3-p426` or `ruby-2.5.7-p0-jruby-9.2.13.0`.
///
/// Two descriptors compare by their `major.minor.patch` release only.
#[derive(Debug, Clone)]
pub struct RubyVersion {
    raw: String,
    release: (u64, u64, u64),
    patchlevel: Option<i64>,
    engine: RubyEngine,
    engine_version: String,
    explicit: bool,
}

impl RubyVersion {
    /// Parses the version an application declared, or `fallback` when it declared none.
    ///
    /// `fallback` is typically the version remembered from the previous build,
    /// else the configured default.
    pub fn parse(raw: &str, fallback: &str) -> BuildResult<Self> {
        let declared = raw.trim();
        if declared.is_empty() {
            Self::from_descriptor(fallback.trim(), false)
        } else {
            Self::from_descriptor(declared, true)
        }
    }

    fn from_descriptor(raw: &str, explicit: bool) -> BuildResult<Self> {
        let malformed = || BuildError::MalformedVersion {
            version: raw.to_string(),
        };
        let caps = descriptor_pattern().captures(raw).ok_or_else(malformed)?;

        let number = |name: &str| -> BuildResult<u64> {
            caps[name].parse().map_err(|_| malformed())
        };
        let release = (number("major")?, number("minor")?, number("patch")?);

        let patchlevel = match caps.name("patchlevel") {
            Some(m) => Some(m.as_str()[1..].parse::<i64>().map_err(|_| malformed())?),
            None => None,
        };

        let engine = caps
            .name("engine")
            .map_or(RubyEngine::Ruby, |m| RubyEngine::from_name(m.as_str()));
        let engine_version = caps.name("engine_version").map_or_else(
            || format!("{}.{}.{}", release.0, release.1, release.2),
            |m| m.as_str().to_string(),
        );

        Ok(Self {
            raw: raw.to_string(),
            release,
            patchlevel,
            engine,
            engine_version,
            explicit,
        })
    }

    fn mri(release: (u64, u64, u64), explicit: bool) -> Self {
        let number = format!("{}.{}.{}", release.0, release.1, release.2);
        Self {
            raw: format!("ruby-{}", number),
            release,
            patchlevel: None,
            engine: RubyEngine::Ruby,
            engine_version: number,
            explicit,
        }
    }

    pub fn version(&self) -> &str {
        &self.raw
    }

    /// `major.minor.patch` without prefix or suffixes.
    pub fn ruby_version(&self) -> String {
        format!("{}.{}.{}", self.release.0, self.release.1, self.release.2)
    }

    pub fn release(&self) -> (u64, u64, u64) {
        self.release
    }

    pub fn major(&self) -> u64 {
        self.release.0
    }

    pub fn minor(&self) -> u64 {
        self.release.1
    }

    pub fn patch(&self) -> u64 {
        self.release.2
    }

    pub fn patchlevel(&self) -> Option<i64> {
        self.patchlevel
    }

    pub fn engine(&self) -> &RubyEngine {
        &self.engine
    }

    /// Same as [`ruby_version`](Self::ruby_version) for MRI.
    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Whether the application declared this version itself.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn is_default(&self) -> bool {
        !self.explicit
    }

    pub fn is_jruby(&self) -> bool {
        self.engine == RubyEngine::Jruby
    }

    pub fn patchlevel_is_significant(&self) -> bool {
        !self.is_jruby() && self.release <= LEGACY_PATCHLEVEL_THRESHOLD
    }

    pub fn version_without_patchlevel(&self) -> String {
        patchlevel_pattern().replacen(&self.raw, 1, "").into_owned()
    }

    /// Identifier of the prebuilt archive. Keeps `-pNNN` only where
    /// patchlevels still distinguish binaries.
    pub fn download_identifier(&self) -> String {
        let keeps_patchlevel =
            self.patchlevel_is_significant() && self.patchlevel.is_some_and(|p| p >= 0);
        if keeps_patchlevel {
            self.raw.clone()
        } else {
            self.version_without_patchlevel()
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.tgz", self.download_identifier())
    }

    pub fn archive_url(&self, vendor_url: &str, stack: &Stack) -> String {
        format!(
            "{}/{}/{}",
            vendor_url.trim_end_matches('/'),
            stack,
            self.file_name()
        )
    }

    /// The `ruby` directive a Gemfile would use to pin this version.
    pub fn to_gemfile(&self) -> String {
        match self.engine {
            RubyEngine::Ruby => format!("ruby '{}'", self.ruby_version()),
            _ => format!(
                "ruby '{}', :engine => '{}', :engine_version => '{}'",
                self.ruby_version(),
                self.engine,
                self.engine_version
            ),
        }
    }

    /// Next patch release, or `None` for versions still numbered by patchlevel.
    ///
    /// All successors are `None` when the incremented component would overflow.
    pub fn successor_patch(&self, increment: u64) -> Option<Self> {
        if self.patchlevel_is_significant() {
            return None;
        }
        let (major, minor, patch) = self.release;
        let patch = patch.checked_add(increment)?;
        Some(Self::mri((major, minor, patch), self.explicit))
    }

    pub fn successor_minor(&self, increment: u64) -> Option<Self> {
        let (major, minor, _) = self.release;
        let minor = minor.checked_add(increment)?;
        Some(Self::mri((major, minor, 0), self.explicit))
    }

    pub fn successor_major(&self, increment: u64) -> Option<Self> {
        let major = self.release.0.checked_add(increment)?;
        Some(Self::mri((major, 0, 0), self.explicit))
    }
}

impl FromStr for RubyVersion {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_descriptor(s.trim(), true)
    }
}

impl fmt::Display for RubyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for RubyVersion {
    fn eq(&self, other: &Self) -> bool {
        self.release == other.release
    }
}

impl Eq for RubyVersion {}

impl Ord for RubyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release.cmp(&other.release)
    }
}

impl PartialOrd for RubyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
