use rubypack_cli::cli::output::VersionDescription;
use rubypack_cli::cli::{CliArgs, Commands, CompileArgs, DetectArgs, OutputFormatter, VersionArgs};
use rubypack_cli::{NAME, VERSION};
use rubypack_core::logging::parse_level;
use rubypack_core::{init_logging, LoggingConfig, RealFileSystem, RubypackConfig};
use rubypack_pipeline::{BuildOrchestrator, BuildRequest};
use rubypack_stack::{DryRunTaskRunner, ProcessTaskRunner, RubyVersion, TaskRunner};

use anyhow::{bail, Context};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info, Level};

fn main() {
    let args = CliArgs::parse();
    let config = RubypackConfig::default();
    init_logging_from_args(&args, &config);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args, config),
        Commands::Compile(compile_args) => handle_compile(compile_args, config),
        Commands::Version(version_args) => handle_version(version_args, &config),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: &RubypackConfig) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        parse_level(&config.log_level)
    };

    init_logging(LoggingConfig {
        level,
        use_json: config.log_json,
        include_target: args.verbose,
        include_location: false,
    });
}

fn existing_dir(path: &Path) -> anyhow::Result<PathBuf> {
    if !path.exists() {
        bail!("Build directory does not exist: {}", path.display());
    }
    if !path.is_dir() {
        bail!("Build directory is not a directory: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize {}", path.display()))
}

fn prepare_cache_dir(path: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create cache directory {}", path.display()))?;
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize {}", path.display()))
}

fn handle_detect(args: &DetectArgs, config: RubypackConfig) -> i32 {
    let build_dir = match existing_dir(&args.build_dir) {
        Ok(dir) => dir,
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    };

    let orchestrator = BuildOrchestrator::new(
        config,
        Arc::new(RealFileSystem::new()),
        Arc::new(DryRunTaskRunner),
    );
    let id = match orchestrator.detect(&build_dir) {
        Ok(Some(id)) => id,
        Ok(None) => {
            info!(app = %build_dir.display(), "No build strategy applies");
            return 1;
        }
        Err(e) => {
            error!("Detection failed: {}", e);
            return 1;
        }
    };

    match OutputFormatter::new(args.format).format_detection(id) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}

fn handle_compile(args: &CompileArgs, config: RubypackConfig) -> i32 {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return 1;
    }

    let build_dir = match existing_dir(&args.build_dir) {
        Ok(dir) => dir,
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    };

    let mut request = BuildRequest::new(build_dir);
    if let Some(cache_dir) = &args.cache_dir {
        let cache_dir = match prepare_cache_dir(cache_dir) {
            Ok(dir) => dir,
            Err(e) => {
                error!("{:#}", e);
                return 1;
            }
        };
        request = request.with_cache(cache_dir);
    }

    let tasks: Arc<dyn TaskRunner> = if args.dry_run {
        info!("Dry run: bundle and rake commands are logged, not executed");
        Arc::new(DryRunTaskRunner)
    } else {
        Arc::new(ProcessTaskRunner::new())
    };

    let orchestrator = BuildOrchestrator::new(config, Arc::new(RealFileSystem::new()), tasks);
    let report = match orchestrator.compile(&request) {
        Ok(report) => report,
        Err(e) => {
            error!("Build failed: {}", e);
            return 1;
        }
    };

    match OutputFormatter::new(args.format).format_report(&report) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}

fn handle_version(args: &VersionArgs, config: &RubypackConfig) -> i32 {
    let version: RubyVersion = match args.version.parse() {
        Ok(version) => version,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let archive_url = (!config.stack.trim().is_empty())
        .then(|| version.archive_url(&config.vendor_url, &config.stack()));
    let description = VersionDescription::new(&version, archive_url);

    match OutputFormatter::new(args.format).format_version(&description) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}
