use super::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ruby buildpack: detect the application type, install gems and cache them between builds.
#[derive(Parser, Debug)]
#[command(name = "rubypack", version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides -v and -q.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print which build strategy applies to an application
    Detect(DetectArgs),

    /// Build an application in place
    Compile(CompileArgs),

    /// Describe a Ruby version descriptor such as ruby-2.5.7-p206-jruby-9.2.13.0
    Version(VersionArgs),
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Application directory
    pub build_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Application directory
    pub build_dir: PathBuf,

    /// Directory kept between builds. Caching is disabled without it.
    pub cache_dir: Option<PathBuf>,

    /// Log the bundle and rake commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Version descriptor, e.g. ruby-3.3.7 or ruby-1.9.3-p551
    pub version: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_compile_arguments() {
        let args = CliArgs::try_parse_from([
            "rubypack", "compile", "/build", "/cache", "--dry-run", "--format", "json",
        ])
        .unwrap();

        match args.command {
            Commands::Compile(compile) => {
                assert_eq!(compile.build_dir, PathBuf::from("/build"));
                assert_eq!(compile.cache_dir, Some(PathBuf::from("/cache")));
                assert!(compile.dry_run);
                assert_eq!(compile.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cache_dir_is_optional() {
        let args = CliArgs::try_parse_from(["rubypack", "compile", "/build"]).unwrap();
        match args.command {
            Commands::Compile(compile) => assert_eq!(compile.cache_dir, None),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[parameterized(
        verbose = { &["rubypack", "-v", "detect", "/app"], true, false },
        quiet = { &["rubypack", "detect", "/app", "-q"], false, true },
        neither = { &["rubypack", "detect", "/app"], false, false },
    )]
    fn test_global_flags(argv: &[&str], verbose: bool, quiet: bool) {
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert_eq!(args.verbose, verbose);
        assert_eq!(args.quiet, quiet);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["rubypack", "-v", "-q", "detect", "/app"]).is_err());
    }
}
