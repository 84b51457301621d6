//! Build strategies
//!
//! Every strategy that builds a Ruby application starts from the generic
//! steps in [`ruby::RubyStrategy`] and calls them explicitly before adding
//! its own. There is no implicit inheritance between strategies.

use crate::dependencies::DependencyResolver;
use crate::task::{TaskCommand, TaskOutcome, TaskRunner};
use crate::version::RubyVersion;
use crate::StrategyId;
use rubypack_cache::{BlobCache, MetadataStore};
use rubypack_core::{BuildResult, FileSystem, Stack};
use std::path::Path;
use std::sync::Arc;

pub mod no_lockfile;
pub mod rack;
pub mod rails;
pub mod ruby;

pub use no_lockfile::NoLockfileStrategy;
pub use rack::RackStrategy;
pub use rails::{AssetPipeline, RailsStrategy};
pub use ruby::RubyStrategy;

/// Everything a strategy may touch while compiling one application.
pub struct BuildContext<'a> {
    pub stack: Stack,
    pub cache: &'a BlobCache,
    pub metadata: &'a MetadataStore,
    pub dependencies: &'a dyn DependencyResolver,
    pub ruby_version: &'a RubyVersion,
    pub tasks: &'a dyn TaskRunner,
    pub buildpack_version: &'a str,
    steps: Vec<String>,
}

impl<'a> BuildContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stack: Stack,
        cache: &'a BlobCache,
        metadata: &'a MetadataStore,
        dependencies: &'a dyn DependencyResolver,
        ruby_version: &'a RubyVersion,
        tasks: &'a dyn TaskRunner,
        buildpack_version: &'a str,
    ) -> Self {
        Self {
            stack,
            cache,
            metadata,
            dependencies,
            ruby_version,
            tasks,
            buildpack_version,
            steps: Vec::new(),
        }
    }

    pub fn app_dir(&self) -> &Path {
        self.cache.workspace()
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        self.cache.fs()
    }

    /// Notes a completed step for the build report.
    pub fn record(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }

    /// Runs `command` and fails the build when it exits unsuccessfully.
    pub fn run_task(&mut self, command: TaskCommand) -> BuildResult<TaskOutcome> {
        let outcome = self
            .tasks
            .run(self.cache.workspace(), &command)?
            .ensure_success(&command)?;
        self.record(command.to_string());
        Ok(outcome)
    }

    pub fn rake_task_defined(&self, task: &str) -> BuildResult<bool> {
        self.tasks.is_defined(self.cache.workspace(), task)
    }
}

pub trait BuildStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    fn name(&self) -> &'static str {
        self.id().label()
    }

    fn compile(&self, ctx: &mut BuildContext<'_>) -> BuildResult<()>;
}

/// Implementation behind each detected strategy identifier.
pub fn strategy_for(id: StrategyId) -> Box<dyn BuildStrategy> {
    if id.uses_cached_assets() {
        return Box::new(RailsStrategy::new(id, AssetPipeline::Cached));
    }
    match id {
        StrategyId::NoLockfile => Box::new(NoLockfileStrategy),
        StrategyId::Rack => Box::new(RackStrategy),
        StrategyId::Rails3 => Box::new(RailsStrategy::new(id, AssetPipeline::Uncached)),
        _ if id.is_rails() => Box::new(RailsStrategy::new(id, AssetPipeline::None)),
        _ => Box::new(RubyStrategy),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::dependencies::ResolvedDependencies;
    use crate::task::MockTaskRunner;
    use rubypack_core::MockFileSystem;
    use std::path::PathBuf;

    pub struct Harness {
        pub fs: Arc<MockFileSystem>,
        pub cache: BlobCache,
        pub metadata: MetadataStore,
        pub dependencies: ResolvedDependencies,
        pub ruby_version: RubyVersion,
        pub tasks: MockTaskRunner,
    }

    impl Harness {
        pub fn new(ruby_version: &str) -> Self {
            let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/app")));
            fs.add_file("/app/Gemfile.lock", "GEM\n");
            let cache = BlobCache::new(
                fs.clone(),
                "/app",
                Some(PathBuf::from("/cache")),
                &Stack::new("scalingo-22"),
            );
            let metadata = MetadataStore::open(cache.clone()).unwrap();
            Self {
                fs,
                cache,
                metadata,
                dependencies: ResolvedDependencies::empty_lockfile(),
                ruby_version: RubyVersion::parse(ruby_version, "ruby-3.3.7").unwrap(),
                tasks: MockTaskRunner::new(),
            }
        }

        pub fn context(&self) -> BuildContext<'_> {
            BuildContext::new(
                Stack::new("scalingo-22"),
                &self.cache,
                &self.metadata,
                &self.dependencies,
                &self.ruby_version,
                &self.tasks,
                "v1.0.0",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_for_every_identifier() {
        for &id in StrategyId::all_variants() {
            let strategy = strategy_for(id);
            assert_eq!(strategy.id(), id);
            assert_eq!(strategy.name(), id.label());
        }
    }

    #[test]
    fn test_cached_asset_generations() {
        let cached: Vec<StrategyId> = StrategyId::all_variants()
            .iter()
            .copied()
            .filter(StrategyId::uses_cached_assets)
            .collect();

        assert!(cached.contains(&StrategyId::Rails4));
        assert!(cached.contains(&StrategyId::Rails8));
        assert!(!cached.contains(&StrategyId::Rails3));
        assert!(!cached.contains(&StrategyId::Rails2));
        assert!(cached.iter().all(StrategyId::is_rails));
    }
}
