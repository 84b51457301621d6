//! Resolved dependency set of the application
//!
//! Probes and the Ruby version lookup only need names and concrete versions,
//! which `Gemfile.lock` already records. Running bundler itself happens elsewhere.

use crate::version::GemVersion;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

pub const LOCKFILE: &str = "Gemfile.lock";

/// Answers questions about the application's resolved gems.
pub trait DependencyResolver: Send + Sync {
    fn has_lockfile(&self) -> bool;

    /// Resolved version of `name`, if the gem is present and its version parses.
    fn gem_version(&self, name: &str) -> Option<GemVersion>;

    fn has_gem(&self, name: &str) -> bool;

    /// Declared interpreter in descriptor form (`ruby-3.3.7`), empty when undeclared.
    fn ruby_version(&self) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedDependencies {
    has_lockfile: bool,
    gems: BTreeMap<String, Option<GemVersion>>,
    ruby_version: Option<String>,
    bundler_version: Option<String>,
}

fn spec_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^ {4}([^\s(]+) \(([^)]+)\)$").expect("static regex"))
}

fn ruby_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^ruby (\d+\.\d+\.\d+)(?:p(-?\d+))?(?: \((\w+) ([^)]+)\))?$")
            .expect("static regex")
    })
}

impl ResolvedDependencies {
    /// An application that has not checked in a lockfile.
    pub fn without_lockfile() -> Self {
        Self::default()
    }

    /// An application with a lockfile but no gems recorded yet.
    pub fn empty_lockfile() -> Self {
        Self {
            has_lockfile: true,
            ..Default::default()
        }
    }

    pub fn with_gem(mut self, name: &str, version: &str) -> Self {
        self.has_lockfile = true;
        self.gems
            .insert(name.to_string(), GemVersion::parse(version));
        self
    }

    pub fn with_ruby_version(mut self, version: &str) -> Self {
        self.ruby_version = Some(version.to_string());
        self
    }

    /// Reads the `specs:` of every GEM, PATH and GIT source plus the
    /// `RUBY VERSION` and `BUNDLED WITH` sections.
    pub fn from_lockfile(content: &str) -> Self {
        let mut resolved = Self::empty_lockfile();
        let mut section = "";
        let mut in_specs = false;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if !line.starts_with(' ') {
                section = line.trim();
                in_specs = false;
                continue;
            }

            match section {
                "GEM" | "PATH" | "GIT" => {
                    if line.trim() == "specs:" {
                        in_specs = true;
                    } else if in_specs {
                        resolved.add_spec(line);
                    }
                }
                "RUBY VERSION" => {
                    resolved.ruby_version = descriptor_from_lockfile(line.trim());
                }
                "BUNDLED WITH" => {
                    resolved.bundler_version = Some(line.trim().to_string());
                }
                _ => {}
            }
        }

        debug!(
            "Parsed {} gems from {} (ruby: {:?})",
            resolved.gems.len(),
            LOCKFILE,
            resolved.ruby_version
        );
        resolved
    }

    fn add_spec(&mut self, line: &str) {
        let Some(caps) = spec_pattern().captures(line) else {
            return;
        };
        // "nokogiri (1.16.0-x86_64-linux)" carries a platform suffix
        let version = caps[2].split('-').next().unwrap_or_default();
        self.gems
            .entry(caps[1].to_string())
            .or_insert_with(|| GemVersion::parse(version));
    }

    pub fn bundler_version(&self) -> Option<&str> {
        self.bundler_version.as_deref()
    }
}

/// `ruby 2.5.7p206 (jruby 9.2.13.0)` becomes `ruby-2.5.7-p206-jruby-9.2.13.0`.
fn descriptor_from_lockfile(line: &str) -> Option<String> {
    let caps = ruby_pattern().captures(line)?;
    let mut descriptor = format!("ruby-{}", &caps[1]);
    if let Some(patchlevel) = caps.get(2) {
        descriptor.push_str(&format!("-p{}", patchlevel.as_str()));
    }
    if let (Some(engine), Some(engine_version)) = (caps.get(3), caps.get(4)) {
        descriptor.push_str(&format!("-{}-{}", engine.as_str(), engine_version.as_str()));
    }
    Some(descriptor)
}

impl DependencyResolver for ResolvedDependencies {
    fn has_lockfile(&self) -> bool {
        self.has_lockfile
    }

    fn gem_version(&self, name: &str) -> Option<GemVersion> {
        self.gems.get(name).cloned().flatten()
    }

    fn has_gem(&self, name: &str) -> bool {
        self.gems.contains_key(name)
    }

    fn ruby_version(&self) -> String {
        self.ruby_version.clone().unwrap_or_default()
    }
}
