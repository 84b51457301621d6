use crate::report::{BuildReport, RubySummary};
use rubypack_cache::{BlobCache, MetadataStore};
use rubypack_core::{BuildError, BuildResult, FileSystem, RubypackConfig};
use rubypack_stack::{
    strategy_for, BuildContext, DependencyResolver, ResolvedDependencies, RubyVersion,
    StrategyChain, StrategyId, TaskRunner, LOCKFILE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const DEFAULT_RUBY_VERSION_KEY: &str = "default_ruby_version";

/// One `compile` invocation: the application and, optionally, a durable cache.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub app_dir: PathBuf,
    pub cache_dir: Option<PathBuf>,
}

impl BuildRequest {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            cache_dir: None,
        }
    }

    pub fn with_cache(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }
}

pub struct BuildOrchestrator {
    config: RubypackConfig,
    fs: Arc<dyn FileSystem>,
    tasks: Arc<dyn TaskRunner>,
    chain: StrategyChain,
}

impl BuildOrchestrator {
    pub fn new(
        config: RubypackConfig,
        fs: Arc<dyn FileSystem>,
        tasks: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            config,
            fs,
            tasks,
            chain: StrategyChain::with_defaults(),
        }
    }

    pub fn with_chain(mut self, chain: StrategyChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn config(&self) -> &RubypackConfig {
        &self.config
    }

    /// Reads `Gemfile.lock` from the application, if there is one.
    pub fn resolve(&self, app_dir: &Path) -> BuildResult<ResolvedDependencies> {
        let lockfile = app_dir.join(LOCKFILE);
        if !self.fs.is_file(&lockfile) {
            debug!(path = %lockfile.display(), "No lockfile found");
            return Ok(ResolvedDependencies::without_lockfile());
        }

        let content = self
            .fs
            .read_to_string(&lockfile)
            .map_err(|e| BuildError::io(format!("Failed to read {}", lockfile.display()), e))?;
        Ok(ResolvedDependencies::from_lockfile(&content))
    }

    pub fn detect(&self, app_dir: &Path) -> BuildResult<Option<StrategyId>> {
        let deps = self.resolve(app_dir)?;
        Ok(self.chain.detect(&deps))
    }

    pub fn compile(&self, request: &BuildRequest) -> BuildResult<BuildReport> {
        let start = Instant::now();
        let app_dir = &request.app_dir;
        info!(app = %app_dir.display(), "Starting build");

        self.config.ensure_supported_platform()?;
        let stack = self.config.stack();

        let phase = Instant::now();
        let deps = self.resolve(app_dir)?;
        let id = self.chain.select(&deps, app_dir)?;
        debug!(
            strategy = %id,
            duration_ms = phase.elapsed().as_millis() as u64,
            "Detection completed"
        );

        let cache = match &request.cache_dir {
            Some(dir) => BlobCache::new(self.fs.clone(), app_dir, Some(dir.clone()), &stack),
            None => {
                info!("No cache directory given, build cache disabled");
                BlobCache::disabled(self.fs.clone(), app_dir)
            }
        };
        let metadata = MetadataStore::open(cache.clone())?;

        let fallback = metadata
            .read(DEFAULT_RUBY_VERSION_KEY)
            .unwrap_or_else(|| self.config.default_ruby_version.clone());
        let ruby_version = RubyVersion::parse(&deps.ruby_version(), &fallback)?;
        info!(
            ruby = %ruby_version,
            explicit = ruby_version.is_explicit(),
            "Resolved Ruby version"
        );

        let strategy = strategy_for(id);
        let buildpack_version = format!("v{}", env!("CARGO_PKG_VERSION"));

        let phase = Instant::now();
        let mut ctx = BuildContext::new(
            stack.clone(),
            &cache,
            &metadata,
            &deps,
            &ruby_version,
            self.tasks.as_ref(),
            &buildpack_version,
        );
        strategy.compile(&mut ctx)?;
        let steps = ctx.into_steps();
        info!(
            strategy = %id,
            steps = steps.len(),
            duration_ms = phase.elapsed().as_millis() as u64,
            "Strategy completed"
        );

        metadata.save()?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(app = %app_dir.display(), duration_ms, "Build completed");

        Ok(BuildReport {
            strategy: id,
            strategy_name: strategy.name().to_string(),
            stack: stack.to_string(),
            ruby: RubySummary {
                version: ruby_version.version().to_string(),
                explicit: ruby_version.is_explicit(),
                download: ruby_version.file_name(),
                archive_url: ruby_version.archive_url(&self.config.vendor_url, &stack),
            },
            bundler_version: deps.bundler_version().map(str::to_string),
            cache_enabled: cache.is_enabled(),
            steps,
            duration_ms,
        })
    }
}
