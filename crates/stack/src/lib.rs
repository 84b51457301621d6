//! Strategy selection for Ruby applications.
//!
//! The resolved dependency set (from `Gemfile.lock`) is run through an
//! ordered [`StrategyChain`] of capability probes; the first match names the
//! [`BuildStrategy`] that compiles the application. Interpreter versions are
//! modelled by [`RubyVersion`], gem versions by [`GemVersion`].

#[macro_use]
pub mod id_enum_macro;

pub mod chain;
pub mod dependencies;
pub mod probe;
pub mod strategy;
pub mod strategy_id;
pub mod task;
pub mod version;

pub use chain::{Candidate, StrategyChain};
pub use dependencies::{DependencyResolver, ResolvedDependencies, LOCKFILE};
pub use probe::{CapabilityProbe, VersionRange};
pub use strategy::{strategy_for, BuildContext, BuildStrategy};
pub use strategy_id::StrategyId;
pub use task::{DryRunTaskRunner, ProcessTaskRunner, TaskCommand, TaskOutcome, TaskRunner};
pub use version::{GemVersion, RubyEngine, RubyVersion};
