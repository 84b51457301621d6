//! Seam between build strategies and the tools they drive (bundler, rake)

use rubypack_core::{BuildError, BuildResult};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "task", rename_all = "snake_case")]
pub enum TaskCommand {
    BundleInstall,
    Rake(String),
}

impl TaskCommand {
    pub fn rake(task: impl Into<String>) -> Self {
        Self::Rake(task.into())
    }

    fn args(&self) -> Vec<&str> {
        match self {
            Self::BundleInstall => vec!["install", "--jobs=4", "--retry=3"],
            Self::Rake(task) => vec!["exec", "rake", task.as_str()],
        }
    }

    fn env(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Self::BundleInstall => vec![
                ("BUNDLE_PATH", "vendor/bundle"),
                ("BUNDLE_BIN", "vendor/bundle/bin"),
                ("BUNDLE_WITHOUT", "development:test"),
                ("BUNDLE_DEPLOYMENT", "1"),
            ],
            Self::Rake(_) => vec![
                ("RAILS_ENV", "production"),
                ("RACK_ENV", "production"),
                ("RAILS_GROUPS", "assets"),
                ("BUNDLE_PATH", "vendor/bundle"),
            ],
        }
    }
}

impl fmt::Display for TaskCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bundle {}", self.args().join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub success: bool,
    pub output: String,
    pub duration: Duration,
}

impl TaskOutcome {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            duration: Duration::ZERO,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            duration: Duration::ZERO,
        }
    }

    /// Turns a failed outcome into [`BuildError::TaskFailed`].
    pub fn ensure_success(self, command: &TaskCommand) -> BuildResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(BuildError::TaskFailed {
                task: command.to_string(),
                output: self.output,
            })
        }
    }
}

/// Runs bundler and rake on behalf of a strategy.
#[cfg_attr(test, mockall::automock)]
pub trait TaskRunner: Send + Sync {
    /// A command that ran and exited non-zero is an unsuccessful outcome, not an error.
    fn run(&self, app_dir: &Path, command: &TaskCommand) -> BuildResult<TaskOutcome>;

    fn is_defined(&self, app_dir: &Path, task: &str) -> BuildResult<bool>;
}

/// Shells out to `bundle` in the application directory.
pub struct ProcessTaskRunner {
    program: String,
}

impl ProcessTaskRunner {
    pub fn new() -> Self {
        Self::with_program("bundle")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn spawn(&self, app_dir: &Path, args: &[&str], env: &[(&str, &str)]) -> BuildResult<TaskOutcome> {
        let started = Instant::now();
        let output = Command::new(&self.program)
            .args(args)
            .envs(env.iter().copied())
            .current_dir(app_dir)
            .output()
            .map_err(|e| {
                BuildError::io(
                    format!("Failed to run `{} {}`", self.program, args.join(" ")),
                    e.into(),
                )
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(TaskOutcome {
            success: output.status.success(),
            output: combined,
            duration: started.elapsed(),
        })
    }
}

impl Default for ProcessTaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner for ProcessTaskRunner {
    fn run(&self, app_dir: &Path, command: &TaskCommand) -> BuildResult<TaskOutcome> {
        info!("Running: {}", command);
        let outcome = self.spawn(app_dir, &command.args(), &command.env())?;
        debug!(
            "`{}` finished in {:.2}s (success: {})",
            command,
            outcome.duration.as_secs_f64(),
            outcome.success
        );
        Ok(outcome)
    }

    fn is_defined(&self, app_dir: &Path, task: &str) -> BuildResult<bool> {
        let listing = self.spawn(
            app_dir,
            &["exec", "rake", "-P"],
            &TaskCommand::rake(task).env(),
        )?;
        if !listing.success {
            debug!("Could not list rake tasks: {}", listing.output.trim());
            return Ok(false);
        }
        Ok(task_listed(&listing.output, task))
    }
}

fn task_listed(listing: &str, task: &str) -> bool {
    let wanted = format!("rake {}", task);
    listing.lines().any(|line| line.trim() == wanted)
}

/// Logs what would run and reports success. No rake task is considered defined.
#[derive(Debug, Default)]
pub struct DryRunTaskRunner;

impl TaskRunner for DryRunTaskRunner {
    fn run(&self, _app_dir: &Path, command: &TaskCommand) -> BuildResult<TaskOutcome> {
        info!("Would run: {}", command);
        Ok(TaskOutcome::succeeded(""))
    }

    fn is_defined(&self, _app_dir: &Path, task: &str) -> BuildResult<bool> {
        debug!("Dry run: treating rake task '{}' as undefined", task);
        Ok(false)
    }
}
