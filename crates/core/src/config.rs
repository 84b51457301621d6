use crate::error::BuildError;
use crate::platform::{Architecture, Stack};
use std::env;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_RUBY_VERSION: &str = "ruby-3.3.7";
const DEFAULT_VENDOR_URL: &str = "https://ruby-binaries.scalingo.com";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("STACK is not set. Set the STACK environment variable (e.g. scalingo-22)")]
    MissingStack,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct RubypackConfig {
    pub stack: String,
    pub arch: String,
    pub default_ruby_version: String,
    pub vendor_url: String,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for RubypackConfig {
    fn default() -> Self {
        let stack = env::var("STACK").unwrap_or_default();

        let arch = env::var("RUBYPACK_ARCH")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| Architecture::host().name().to_string());

        let default_ruby_version = env::var("RUBYPACK_DEFAULT_RUBY_VERSION")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_RUBY_VERSION.to_string());

        let vendor_url = env::var("BUILDPACK_VENDOR_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VENDOR_URL.to_string());

        let log_level = env::var("RUBYPACK_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env::var("RUBYPACK_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            stack,
            arch,
            default_ruby_version,
            vendor_url,
            log_level,
            log_json,
        }
    }
}

impl RubypackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack.trim().is_empty() {
            return Err(ConfigError::MissingStack);
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if !looks_like_ruby_version(&self.default_ruby_version) {
            return Err(ConfigError::ValidationFailed(format!(
                "Default ruby version must look like ruby-X.Y.Z, got '{}'",
                self.default_ruby_version
            )));
        }

        if self.vendor_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Vendor URL cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn stack(&self) -> Stack {
        Stack::new(self.stack.clone())
    }

    pub fn architecture(&self) -> Architecture {
        Architecture::new(self.arch.clone())
    }

    /// Fails when the host architecture cannot run the binaries for this stack.
    pub fn ensure_supported_platform(&self) -> Result<(), BuildError> {
        self.architecture().ensure_supported(&self.stack())
    }
}

fn looks_like_ruby_version(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("ruby-") else {
        return false;
    };
    let release = rest.split('-').next().unwrap_or("");
    let parts: Vec<&str> = release.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

impl fmt::Display for RubypackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rubypack Configuration:")?;
        writeln!(f, "  Stack: {}", self.stack)?;
        writeln!(f, "  Architecture: {}", self.arch)?;
        writeln!(f, "  Default Ruby Version: {}", self.default_ruby_version)?;
        writeln!(f, "  Vendor URL: {}", self.vendor_url)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Log JSON: {}", self.log_json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn remove(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn valid_config() -> RubypackConfig {
        RubypackConfig {
            stack: "scalingo-22".to_string(),
            arch: "amd64".to_string(),
            default_ruby_version: DEFAULT_RUBY_VERSION.to_string(),
            vendor_url: DEFAULT_VENDOR_URL.to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = [
            EnvGuard::set("STACK", "scalingo-22"),
            EnvGuard::remove("RUBYPACK_DEFAULT_RUBY_VERSION"),
            EnvGuard::remove("BUILDPACK_VENDOR_URL"),
            EnvGuard::remove("RUBYPACK_LOG_LEVEL"),
            EnvGuard::remove("RUBYPACK_LOG_JSON"),
        ];

        let config = RubypackConfig::default();

        assert_eq!(config.stack, "scalingo-22");
        assert_eq!(config.default_ruby_version, DEFAULT_RUBY_VERSION);
        assert_eq!(config.vendor_url, DEFAULT_VENDOR_URL);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(!config.log_json);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = [
            EnvGuard::set("STACK", "scalingo-24"),
            EnvGuard::set("RUBYPACK_ARCH", "arm64"),
            EnvGuard::set("RUBYPACK_DEFAULT_RUBY_VERSION", "ruby-3.4.1"),
            EnvGuard::set("BUILDPACK_VENDOR_URL", "https://mirror.example.com"),
            EnvGuard::set("RUBYPACK_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("RUBYPACK_LOG_JSON", "true"),
        ];

        let config = RubypackConfig::default();

        assert_eq!(config.stack, "scalingo-24");
        assert_eq!(config.arch, "arm64");
        assert_eq!(config.default_ruby_version, "ruby-3.4.1");
        assert_eq!(config.vendor_url, "https://mirror.example.com");
        assert_eq!(config.log_level, "debug");
        assert!(config.log_json);
    }

    #[test]
    #[serial]
    fn test_missing_stack() {
        let _guard = EnvGuard::remove("STACK");

        let config = RubypackConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingStack)));
    }

    #[test]
    fn test_invalid_log_level() {
        let config = RubypackConfig {
            log_level: "loud".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_default_ruby_version() {
        for bad in ["3.3.7", "ruby-3.3", "ruby-3.x.1", "jruby-9.4.0"] {
            let config = RubypackConfig {
                default_ruby_version: bad.to_string(),
                ..valid_config()
            };
            assert!(config.validate().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_default_ruby_version_with_patchlevel_is_valid() {
        let config = RubypackConfig {
            default_ruby_version: "ruby-1.9.3-p551".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_platform_check() {
        assert!(valid_config().ensure_supported_platform().is_ok());

        let config = RubypackConfig {
            arch: "arm64".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.ensure_supported_platform(),
            Err(BuildError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", valid_config());
        assert!(display.contains("Rubypack Configuration:"));
        assert!(display.contains("Stack: scalingo-22"));
    }
}
