//! RubyGems version ordering
//!
//! `GemVersion` compares the way `Gem::Version` does: trailing zero segments
//! are ignored (`2.1 == 2.1.0`), and a letter segment sorts before any number
//! in the same position, so `8.0.0.alpha < 8.0.0 < 8.0.1`.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct GemVersion {
    raw: String,
    segments: Vec<Segment>,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]+(\.[0-9a-zA-Z]+)*(-[0-9A-Za-z-]+(\.[0-9A-Za-z-]+)*)?$")
            .expect("static regex")
    })
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+|[a-zA-Z]+").expect("static regex"))
}

impl GemVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !version_pattern().is_match(raw) {
            return None;
        }

        let normalized = raw.replace('-', ".pre.");
        let mut segments = Vec::new();
        for m in segment_pattern().find_iter(&normalized) {
            let text = m.as_str();
            let segment = if text.as_bytes()[0].is_ascii_digit() {
                Segment::Number(text.parse().ok()?)
            } else {
                Segment::Text(text.to_string())
            };
            segments.push(segment);
        }

        Some(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Segments with trailing zeros dropped from the release part and the prerelease part.
    fn canonical_segments(&self) -> Vec<&Segment> {
        let split = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Text(_)))
            .unwrap_or(self.segments.len());
        let (release, prerelease) = self.segments.split_at(split);

        let mut canonical = trim_zeros(release);
        canonical.extend(trim_zeros(prerelease));
        canonical
    }
}

fn trim_zeros(segments: &[Segment]) -> Vec<&Segment> {
    let end = segments
        .iter()
        .rposition(|s| *s != Segment::Number(0))
        .map_or(0, |i| i + 1);
    segments[..end].iter().collect()
}

impl Ord for GemVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = Segment::Number(0);
        let lhs = self.canonical_segments();
        let rhs = other.canonical_segments();

        for i in 0..lhs.len().max(rhs.len()) {
            let l = lhs.get(i).copied().unwrap_or(&zero);
            let r = rhs.get(i).copied().unwrap_or(&zero);
            let ordering = match (l, r) {
                (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
                (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
                (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
                (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for GemVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GemVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GemVersion {}

impl FromStr for GemVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Malformed version number string {}", s))
    }
}

impl fmt::Display for GemVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for GemVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
