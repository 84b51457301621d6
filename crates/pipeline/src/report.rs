use rubypack_stack::StrategyId;
use serde::Serialize;
use std::fmt;

/// Summary of one `compile` run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub strategy: StrategyId,
    pub strategy_name: String,
    pub stack: String,
    pub ruby: RubySummary,
    pub bundler_version: Option<String>,
    pub cache_enabled: bool,
    pub steps: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RubySummary {
    pub version: String,
    pub explicit: bool,
    pub download: String,
    pub archive_url: String,
}

impl BuildReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-----> {} app detected", self.strategy_name)?;
        let source = if self.ruby.explicit {
            "declared in Gemfile.lock"
        } else {
            "default"
        };
        writeln!(f, "       Ruby: {} ({})", self.ruby.version, source)?;
        writeln!(f, "       Archive: {}", self.ruby.archive_url)?;
        writeln!(f, "       Stack: {}", self.stack)?;
        if let Some(bundler) = &self.bundler_version {
            writeln!(f, "       Bundler: {}", bundler)?;
        }
        if !self.cache_enabled {
            writeln!(f, "       Build cache disabled")?;
        }
        for step in &self.steps {
            writeln!(f, "-----> {}", step)?;
        }
        write!(f, "       Done in {} ms", self.duration_ms)
    }
}
