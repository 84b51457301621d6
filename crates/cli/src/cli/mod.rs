pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, CompileArgs, DetectArgs, VersionArgs};
pub use output::{OutputFormat, OutputFormatter};
