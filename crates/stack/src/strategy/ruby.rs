use super::{BuildContext, BuildStrategy};
use crate::task::TaskCommand;
use crate::StrategyId;
use rubypack_core::{BuildError, BuildResult};
use tracing::info;

pub const BUNDLE_DIR: &str = "vendor/bundle";

/// Plain Ruby application: install the bundle and cache it.
pub struct RubyStrategy;

impl RubyStrategy {
    /// Steps shared by every Ruby application, in order.
    pub fn run_generic_steps(ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        Self::purge_stale_bundle(ctx)?;
        Self::remember_default_version(ctx)?;
        Self::install_gems(ctx)?;
        ctx.metadata
            .write("buildpack_version", ctx.buildpack_version)?;
        Ok(())
    }

    /// Gems compiled for another stack or interpreter cannot be reused.
    fn purge_stale_bundle(ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        let stack = ctx.stack.to_string();
        let ruby_version = ctx.ruby_version.version().to_string();

        let previous_stack = ctx.metadata.read("stack");
        let previous_ruby = ctx.metadata.read("ruby_version");

        let stack_changed = previous_stack.as_deref().is_some_and(|s| s != stack);
        let ruby_changed = previous_ruby.as_deref().is_some_and(|v| v != ruby_version);

        if stack_changed || ruby_changed {
            if stack_changed {
                info!(
                    "Changing stack from {} to {}, purging cached gems",
                    previous_stack.as_deref().unwrap_or_default(),
                    stack
                );
            } else {
                info!(
                    "Ruby version change detected ({} to {}), purging cached gems",
                    previous_ruby.as_deref().unwrap_or_default(),
                    ruby_version
                );
            }
            ctx.cache.clear(BUNDLE_DIR)?;
            let local = ctx.app_dir().join(BUNDLE_DIR);
            ctx.fs()
                .remove_all(&local)
                .map_err(|e| BuildError::io("Failed to remove stale bundle", e))?;
            ctx.record("purge vendor/bundle");
        }

        ctx.metadata.write_deferred("stack", &stack)?;
        ctx.metadata.write_deferred("ruby_version", &ruby_version)?;
        ctx.metadata.save()?;
        Ok(())
    }

    /// Pins the default interpreter for applications that never declared one,
    /// so a later change of the default does not silently upgrade them.
    fn remember_default_version(ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        if ctx.ruby_version.is_explicit() {
            return Ok(());
        }
        let pinned: String = ctx
            .metadata
            .fetch("default_ruby_version", || ctx.ruby_version.version().to_string())?;
        info!("Using default Ruby version {}", pinned);
        Ok(())
    }

    fn install_gems(ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        info!("Installing dependencies using bundler");
        if ctx.cache.load(BUNDLE_DIR)? {
            ctx.record("restore vendor/bundle");
        }

        ctx.run_task(TaskCommand::BundleInstall)?;

        if ctx.cache.store(BUNDLE_DIR)? {
            ctx.record("store vendor/bundle");
        }
        Ok(())
    }
}

impl BuildStrategy for RubyStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Ruby
    }

    fn compile(&self, ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        Self::run_generic_steps(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::Harness;
    use crate::task::TaskOutcome;
    use rubypack_core::FileSystem;
    use std::path::Path;

    fn bundle_succeeds(harness: &mut Harness) {
        harness
            .tasks
            .expect_run()
            .withf(|_, command| *command == TaskCommand::BundleInstall)
            .times(1)
            .returning(|_, _| Ok(TaskOutcome::succeeded("Bundle complete!")));
    }

    #[test]
    fn test_generic_steps_record_facts() {
        let mut harness = Harness::new("ruby-3.3.7");
        bundle_succeeds(&mut harness);
        harness.fs.add_file("/app/vendor/bundle/ruby/3.3.0/gems/rack", "");

        let mut ctx = harness.context();
        RubyStrategy.compile(&mut ctx).unwrap();
        assert_eq!(
            ctx.steps(),
            &[
                "bundle install --jobs=4 --retry=3".to_string(),
                "store vendor/bundle".to_string()
            ]
        );

        let metadata = &harness.metadata;
        assert_eq!(metadata.read("stack").as_deref(), Some("scalingo-22"));
        assert_eq!(metadata.read("ruby_version").as_deref(), Some("ruby-3.3.7"));
        assert_eq!(metadata.read("buildpack_version").as_deref(), Some("v1.0.0"));
        assert!(!metadata.exists("default_ruby_version"));
        assert!(harness
            .fs
            .exists(Path::new("/cache/vendor/bundle/ruby/3.3.0/gems/rack")));
    }

    #[test]
    fn test_restores_cached_bundle() {
        let mut harness = Harness::new("ruby-3.3.7");
        bundle_succeeds(&mut harness);
        harness.fs.add_file("/cache/vendor/bundle/cached_gem", "");

        let mut ctx = harness.context();
        RubyStrategy.compile(&mut ctx).unwrap();

        assert_eq!(ctx.steps()[0], "restore vendor/bundle");
        assert!(harness.fs.exists(Path::new("/app/vendor/bundle/cached_gem")));
    }

    #[test]
    fn test_ruby_change_purges_bundle() {
        let mut harness = Harness::new("ruby-3.3.7");
        bundle_succeeds(&mut harness);
        harness.metadata.write("stack", "scalingo-22").unwrap();
        harness.metadata.write("ruby_version", "ruby-3.2.2").unwrap();
        harness.fs.add_file("/cache/vendor/bundle/old_gem", "");
        harness.fs.add_file("/app/vendor/bundle/old_gem", "");

        let mut ctx = harness.context();
        RubyStrategy.compile(&mut ctx).unwrap();

        assert_eq!(ctx.steps()[0], "purge vendor/bundle");
        assert!(!harness.fs.exists(Path::new("/cache/vendor/bundle/old_gem")));
        assert!(!harness.fs.exists(Path::new("/app/vendor/bundle/old_gem")));
        assert_eq!(
            harness.metadata.read("ruby_version").as_deref(),
            Some("ruby-3.3.7")
        );
    }

    #[test]
    fn test_stack_change_purges_bundle() {
        let mut harness = Harness::new("ruby-3.3.7");
        bundle_succeeds(&mut harness);
        harness.metadata.write("stack", "scalingo-20").unwrap();
        harness.fs.add_file("/cache/vendor/bundle/old_gem", "");

        let mut ctx = harness.context();
        RubyStrategy.compile(&mut ctx).unwrap();

        assert!(!harness.fs.exists(Path::new("/cache/vendor/bundle/old_gem")));
    }

    #[test]
    fn test_same_stack_and_ruby_keeps_bundle() {
        let mut harness = Harness::new("ruby-3.3.7");
        bundle_succeeds(&mut harness);
        harness.metadata.write("stack", "scalingo-22").unwrap();
        harness.metadata.write("ruby_version", "ruby-3.3.7").unwrap();
        harness.fs.add_file("/cache/vendor/bundle/kept_gem", "");

        let mut ctx = harness.context();
        RubyStrategy.compile(&mut ctx).unwrap();

        assert!(!ctx.steps().contains(&"purge vendor/bundle".to_string()));
        assert!(harness.fs.exists(Path::new("/cache/vendor/bundle/kept_gem")));
    }

    #[test]
    fn test_default_version_is_pinned() {
        let mut harness = Harness::new("");
        bundle_succeeds(&mut harness);

        let mut ctx = harness.context();
        RubyStrategy.compile(&mut ctx).unwrap();

        assert_eq!(
            harness.metadata.read("default_ruby_version").as_deref(),
            Some("ruby-3.3.7")
        );
    }

    #[test]
    fn test_bundle_failure_aborts() {
        let mut harness = Harness::new("ruby-3.3.7");
        harness
            .tasks
            .expect_run()
            .returning(|_, _| Ok(TaskOutcome::failed("Could not find gem 'rails'")));

        let mut ctx = harness.context();
        let err = RubyStrategy.compile(&mut ctx).unwrap_err();

        assert!(matches!(err, BuildError::TaskFailed { .. }));
        assert!(!harness.metadata.exists("buildpack_version"));
    }
}
