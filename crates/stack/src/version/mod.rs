//! Version models: RubyGems versions for dependency probes and Ruby
//! interpreter descriptors for the runtime download.

pub mod gem;
pub mod ruby;

pub use gem::GemVersion;
pub use ruby::{RubyEngine, RubyVersion, LEGACY_PATCHLEVEL_THRESHOLD};
