use anyhow::Result;
use clap::ValueEnum;
use rubypack_pipeline::BuildReport;
use rubypack_stack::{RubyVersion, StrategyId};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Serialize)]
struct DetectionOutput<'a> {
    strategy: StrategyId,
    name: &'a str,
}

/// Everything `rubypack version` reports about one descriptor.
#[derive(Debug, Serialize)]
pub struct VersionDescription {
    pub version: String,
    pub ruby_version: String,
    pub engine: String,
    pub engine_version: String,
    pub patchlevel: Option<i64>,
    pub patchlevel_is_significant: bool,
    pub download: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
    pub gemfile: String,
    pub next_patch: Option<String>,
    pub next_minor: Option<String>,
    pub next_major: Option<String>,
}

impl VersionDescription {
    pub fn new(version: &RubyVersion, archive_url: Option<String>) -> Self {
        Self {
            version: version.version().to_string(),
            ruby_version: version.ruby_version(),
            engine: version.engine().to_string(),
            engine_version: version.engine_version().to_string(),
            patchlevel: version.patchlevel(),
            patchlevel_is_significant: version.patchlevel_is_significant(),
            download: version.file_name(),
            archive_url,
            gemfile: version.to_gemfile(),
            next_patch: version.successor_patch(1).map(|v| v.to_string()),
            next_minor: version.successor_minor(1).map(|v| v.to_string()),
            next_major: version.successor_major(1).map(|v| v.to_string()),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_detection(&self, id: StrategyId) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(id.label().to_string()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&DetectionOutput {
                strategy: id,
                name: id.label(),
            })?),
        }
    }

    pub fn format_report(&self, report: &BuildReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(report.to_string()),
            OutputFormat::Json => Ok(report.to_json()?),
        }
    }

    pub fn format_version(&self, description: &VersionDescription) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(description)?),
            OutputFormat::Human => {
                let mut out = String::new();
                writeln!(out, "Version:       {}", description.version)?;
                writeln!(out, "Ruby:          {}", description.ruby_version)?;
                writeln!(
                    out,
                    "Engine:        {} {}",
                    description.engine, description.engine_version
                )?;
                if let Some(patchlevel) = description.patchlevel {
                    let note = if description.patchlevel_is_significant {
                        ""
                    } else {
                        " (ignored)"
                    };
                    writeln!(out, "Patchlevel:    {}{}", patchlevel, note)?;
                }
                writeln!(out, "Download:      {}", description.download)?;
                if let Some(url) = &description.archive_url {
                    writeln!(out, "Archive URL:   {}", url)?;
                }
                writeln!(out, "Gemfile:       {}", description.gemfile)?;
                let successors = [
                    ("Next patch:", &description.next_patch),
                    ("Next minor:", &description.next_minor),
                    ("Next major:", &description.next_major),
                ];
                for (label, next) in successors {
                    if let Some(next) = next {
                        writeln!(out, "{:<14} {}", label, next)?;
                    }
                }
                Ok(out.trim_end().to_string())
            }
        }
    }
}
