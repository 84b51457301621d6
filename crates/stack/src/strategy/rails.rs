use super::{BuildContext, BuildStrategy, RubyStrategy};
use crate::task::TaskCommand;
use crate::StrategyId;
use rubypack_cache::StaleFileCleaner;
use rubypack_core::fs::FileType;
use rubypack_core::BuildResult;
use tracing::{info, warn};

pub const PUBLIC_ASSETS: &str = "public/assets";
pub const ASSETS_CACHE: &str = "tmp/cache/assets";
/// The sprockets cache is trimmed to 50 MiB before it is stored.
pub const ASSETS_CACHE_LIMIT: u64 = 52_428_800;

const PRECOMPILE: &str = "assets:precompile";
const CLEAN: &str = "assets:clean";

/// How a Rails generation compiles its assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetPipeline {
    /// Rails 2 has no asset pipeline.
    None,
    /// Rails 3 precompiles from scratch on every build.
    Uncached,
    /// Rails 4 and later restore compiled assets and the sprockets cache first.
    Cached,
}

pub struct RailsStrategy {
    id: StrategyId,
    assets: AssetPipeline,
    assets_cache_limit: u64,
}

impl RailsStrategy {
    pub fn new(id: StrategyId, assets: AssetPipeline) -> Self {
        Self {
            id,
            assets,
            assets_cache_limit: ASSETS_CACHE_LIMIT,
        }
    }

    pub fn with_assets_cache_limit(mut self, limit: u64) -> Self {
        self.assets_cache_limit = limit;
        self
    }

    fn precompile_uncached(ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        let manifest = ctx.app_dir().join(PUBLIC_ASSETS).join("manifest.yml");
        if ctx.fs().exists(&manifest) {
            info!("Detected manifest.yml, assuming assets were compiled locally");
            return Ok(());
        }
        if !ctx.rake_task_defined(PRECOMPILE)? {
            return Ok(());
        }

        info!("Preparing app for Rails asset pipeline");
        ctx.run_task(TaskCommand::rake(PRECOMPILE))?;
        Ok(())
    }

    fn precompile_cached(&self, ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        if has_sprockets_manifest(ctx) {
            info!("Detected manifest file, assuming assets were compiled locally");
            return Ok(());
        }
        if !ctx.rake_task_defined(PRECOMPILE)? {
            return Ok(());
        }

        info!("Preparing app for Rails asset pipeline");
        if ctx.cache.load_without_overwrite(PUBLIC_ASSETS)? {
            ctx.record("restore public/assets");
        }
        if ctx.cache.load(ASSETS_CACHE)? {
            ctx.record("restore tmp/cache/assets");
        }

        let outcome = ctx.run_task(TaskCommand::rake(PRECOMPILE))?;
        info!(
            "Asset precompilation completed ({:.2}s)",
            outcome.duration.as_secs_f64()
        );

        if ctx.rake_task_defined(CLEAN)? {
            info!("Cleaning assets");
            let clean = TaskCommand::rake(CLEAN);
            let outcome = ctx.tasks.run(ctx.app_dir(), &clean)?;
            if outcome.success {
                ctx.record(clean.to_string());
            } else {
                warn!("{} failed, keeping previous assets: {}", clean, outcome.output.trim());
            }

            let assets_cache = ctx.app_dir().join(ASSETS_CACHE);
            let cleaned = StaleFileCleaner::new(ctx.fs().clone(), assets_cache)
                .clean_over(self.assets_cache_limit)?;
            if cleaned.removed_files > 0 {
                ctx.record("trim tmp/cache/assets");
            }

            ctx.cache.store(PUBLIC_ASSETS)?;
            ctx.cache.store(ASSETS_CACHE)?;
            ctx.record("store public/assets");
            ctx.record("store tmp/cache/assets");
        }
        Ok(())
    }
}

/// Sprockets writes `.sprockets-manifest-<digest>.json` (or `manifest-<digest>.json`
/// on older releases) next to the compiled assets.
fn has_sprockets_manifest(ctx: &BuildContext<'_>) -> bool {
    let dir = ctx.app_dir().join(PUBLIC_ASSETS);
    let Ok(entries) = ctx.fs().read_dir(&dir) else {
        return false;
    };
    entries.iter().any(|entry| {
        let name = entry.file_name();
        entry.file_type != FileType::Directory
            && name.ends_with(".json")
            && (name.starts_with(".sprockets-manifest-") || name.starts_with("manifest-"))
    })
}

impl BuildStrategy for RailsStrategy {
    fn id(&self) -> StrategyId {
        self.id
    }

    fn compile(&self, ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        RubyStrategy::run_generic_steps(ctx)?;

        match self.assets {
            AssetPipeline::None => Ok(()),
            AssetPipeline::Uncached => Self::precompile_uncached(ctx),
            AssetPipeline::Cached => self.precompile_cached(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::Harness;
    use crate::strategy::strategy_for;
    use crate::task::TaskOutcome;
    use rubypack_core::{BuildError, FileSystem};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Accepts every command, records it, and marks the given rake tasks as defined.
    fn accept_tasks(harness: &mut Harness, defined: &'static [&'static str]) -> Arc<Mutex<Vec<String>>> {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let log = ran.clone();
        harness.tasks.expect_run().returning(move |_, command| {
            log.lock().unwrap().push(command.to_string());
            Ok(TaskOutcome::succeeded(""))
        });
        harness
            .tasks
            .expect_is_defined()
            .returning(move |_, task| Ok(defined.contains(&task)));
        ran
    }

    fn cached() -> RailsStrategy {
        RailsStrategy::new(StrategyId::Rails6, AssetPipeline::Cached)
    }

    #[test]
    fn test_strategy_for_rails_generations() {
        assert_eq!(strategy_for(StrategyId::Rails8).id(), StrategyId::Rails8);
        assert_eq!(strategy_for(StrategyId::Rails3).name(), "Ruby/Rails");
    }

    #[test]
    fn test_cached_precompile_flow() {
        let mut harness = Harness::new("ruby-3.3.7");
        let ran = accept_tasks(&mut harness, &[PRECOMPILE, CLEAN]);
        harness.fs.add_file("/cache/public/assets/old.css", "old");
        harness.fs.add_file("/cache/public/assets/app.css", "cached");
        harness.fs.add_file("/app/public/assets/app.css", "fresh");
        harness.fs.add_file("/cache/tmp/cache/assets/sprockets/cache", "warm");

        let mut ctx = harness.context();
        cached().compile(&mut ctx).unwrap();

        assert_eq!(
            *ran.lock().unwrap(),
            vec![
                "bundle install --jobs=4 --retry=3".to_string(),
                "bundle exec rake assets:precompile".to_string(),
                "bundle exec rake assets:clean".to_string(),
            ]
        );
        let steps = ctx.steps();
        assert!(steps.contains(&"restore public/assets".to_string()));
        assert!(steps.contains(&"store tmp/cache/assets".to_string()));

        let fs = &harness.fs;
        assert_eq!(
            fs.read_to_string(Path::new("/app/public/assets/app.css")).unwrap(),
            "fresh"
        );
        assert!(fs.exists(Path::new("/app/public/assets/old.css")));
        assert!(fs.exists(Path::new("/app/tmp/cache/assets/sprockets/cache")));
        assert_eq!(
            fs.read_to_string(Path::new("/cache/public/assets/app.css")).unwrap(),
            "fresh"
        );
    }

    #[test]
    fn test_assets_cache_is_trimmed_before_store() {
        let mut harness = Harness::new("ruby-3.3.7");
        accept_tasks(&mut harness, &[PRECOMPILE, CLEAN]);
        harness.fs.add_file("/app/tmp/cache/assets/sprockets/stale", "0123456789");
        harness.fs.add_file("/app/tmp/cache/assets/sprockets/fresh", "0123456789");

        let mut ctx = harness.context();
        cached()
            .with_assets_cache_limit(12)
            .compile(&mut ctx)
            .unwrap();

        assert!(ctx.steps().contains(&"trim tmp/cache/assets".to_string()));
        let fs = &harness.fs;
        assert!(!fs.exists(Path::new("/app/tmp/cache/assets/sprockets/stale")));
        assert_eq!(
            fs.list_files("/cache/tmp/cache/assets"),
            vec![std::path::PathBuf::from("sprockets/fresh")]
        );
    }

    #[test]
    fn test_assets_cache_under_limit_is_untouched() {
        let mut harness = Harness::new("ruby-3.3.7");
        accept_tasks(&mut harness, &[PRECOMPILE, CLEAN]);
        harness.fs.add_file("/app/tmp/cache/assets/sprockets/a", "0123456789");

        let mut ctx = harness.context();
        cached().compile(&mut ctx).unwrap();

        assert!(!ctx.steps().iter().any(|s| s.starts_with("trim")));
        assert!(harness
            .fs
            .exists(Path::new("/cache/tmp/cache/assets/sprockets/a")));
    }

    #[test]
    fn test_without_clean_task_assets_are_not_stored() {
        let mut harness = Harness::new("ruby-3.3.7");
        accept_tasks(&mut harness, &[PRECOMPILE]);
        harness.fs.add_file("/app/public/assets/app.css", "fresh");

        let mut ctx = harness.context();
        cached().compile(&mut ctx).unwrap();

        assert!(!harness.fs.exists(Path::new("/cache/public/assets")));
    }

    #[test]
    fn test_sprockets_manifest_skips_precompile() {
        let mut harness = Harness::new("ruby-3.3.7");
        let ran = accept_tasks(&mut harness, &[PRECOMPILE, CLEAN]);
        harness
            .fs
            .add_file("/app/public/assets/.sprockets-manifest-abc123.json", "{}");

        let mut ctx = harness.context();
        cached().compile(&mut ctx).unwrap();

        assert_eq!(ran.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_undefined_precompile_is_skipped() {
        let mut harness = Harness::new("ruby-3.3.7");
        let ran = accept_tasks(&mut harness, &[]);
        harness.fs.add_file("/cache/public/assets/app.css", "cached");

        let mut ctx = harness.context();
        cached().compile(&mut ctx).unwrap();

        assert_eq!(ran.lock().unwrap().len(), 1);
        assert!(!harness.fs.exists(Path::new("/app/public/assets/app.css")));
    }

    #[test]
    fn test_precompile_failure_is_fatal() {
        let mut harness = Harness::new("ruby-3.3.7");
        harness.tasks.expect_run().returning(|_, command| match command {
            TaskCommand::BundleInstall => Ok(TaskOutcome::succeeded("")),
            TaskCommand::Rake(_) => Ok(TaskOutcome::failed("Sass::SyntaxError")),
        });
        harness.tasks.expect_is_defined().returning(|_, _| Ok(true));

        let mut ctx = harness.context();
        let err = cached().compile(&mut ctx).unwrap_err();

        match err {
            BuildError::TaskFailed { task, output } => {
                assert_eq!(task, "bundle exec rake assets:precompile");
                assert_eq!(output, "Sass::SyntaxError");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rails3_precompiles_without_cache() {
        let mut harness = Harness::new("ruby-3.3.7");
        let ran = accept_tasks(&mut harness, &[PRECOMPILE, CLEAN]);
        harness.fs.add_file("/cache/public/assets/old.css", "old");
        harness.fs.add_file("/app/public/assets/app.css", "fresh");

        let mut ctx = harness.context();
        RailsStrategy::new(StrategyId::Rails3, AssetPipeline::Uncached)
            .compile(&mut ctx)
            .unwrap();

        assert_eq!(
            ran.lock().unwrap().last().map(String::as_str),
            Some("bundle exec rake assets:precompile")
        );
        assert!(!harness.fs.exists(Path::new("/app/public/assets/old.css")));
    }

    #[test]
    fn test_rails3_manifest_skips_precompile() {
        let mut harness = Harness::new("ruby-3.3.7");
        let ran = accept_tasks(&mut harness, &[PRECOMPILE]);
        harness.fs.add_file("/app/public/assets/manifest.yml", "---");

        let mut ctx = harness.context();
        RailsStrategy::new(StrategyId::Rails3, AssetPipeline::Uncached)
            .compile(&mut ctx)
            .unwrap();

        assert_eq!(ran.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rails2_runs_generic_steps_only() {
        let mut harness = Harness::new("ruby-3.3.7");
        let ran = accept_tasks(&mut harness, &[PRECOMPILE]);

        let mut ctx = harness.context();
        strategy_for(StrategyId::Rails2).compile(&mut ctx).unwrap();

        assert_eq!(
            *ran.lock().unwrap(),
            vec!["bundle install --jobs=4 --retry=3".to_string()]
        );
    }
}
