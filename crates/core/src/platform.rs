//! Target platform: the `STACK` identifier and the host architecture.

use crate::error::BuildError;
use crate::fs::CopyMode;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const KNOWN_ARCHITECTURES: &[&str] = &["amd64"];

/// Stacks that ship more than one architecture.
pub const MULTI_ARCH_STACKS: &[&str] = &[];

/// Stacks whose `cp` predates `--update=none`.
const NO_CLOBBER_STACKS: &[&str] = &["heroku-22", "scalingo-20", "scalingo-22"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack(String);

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Copy mode used when restoring cache contents without replacing existing files.
    pub fn no_overwrite_mode(&self) -> CopyMode {
        if NO_CLOBBER_STACKS.contains(&self.0.as_str()) {
            CopyMode::NoClobber
        } else {
            CopyMode::UpdateNone
        }
    }

    pub fn is_multi_arch(&self) -> bool {
        MULTI_ARCH_STACKS.contains(&self.0.as_str())
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host architecture in dpkg naming (`amd64`, `arm64`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Architecture(String);

impl Architecture {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn host() -> Self {
        Self::from_rust_arch(std::env::consts::ARCH)
    }

    pub fn from_rust_arch(arch: &str) -> Self {
        let name = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "i386",
            other => other,
        };
        Self(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn ensure_supported(&self, stack: &Stack) -> Result<(), BuildError> {
        if KNOWN_ARCHITECTURES.contains(&self.0.as_str()) {
            return Ok(());
        }
        if stack.is_multi_arch() && self.0 == "arm64" {
            return Ok(());
        }
        Err(BuildError::UnsupportedPlatform {
            arch: self.0.clone(),
            known: KNOWN_ARCHITECTURES.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
