pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod platform;

pub use config::{ConfigError, RubypackConfig};
pub use error::{BuildError, BuildResult};
pub use fs::{CopyMode, FileSystem, MockFileSystem, RealFileSystem};
pub use logging::{init_logging, LoggingConfig};
pub use platform::{Architecture, Stack};
