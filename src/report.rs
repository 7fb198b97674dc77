use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

/// Parsed SpotBugs report. Mirrors the `BugCollection` root element.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct BugCollection {
    #[serde(rename = "BugInstance", default)]
    pub(crate) bug_instances: Vec<BugInstance>,
    #[serde(rename = "BugPattern", default)]
    pub(crate) bug_patterns: Vec<BugPattern>,
}

/// One reported violation.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct BugInstance {
    #[serde(rename = "@type", default)]
    pub(crate) bug_type: String,
    #[serde(rename = "ShortMessage", default)]
    pub(crate) short_message: Option<String>,
    #[serde(rename = "LongMessage", default)]
    pub(crate) long_message: Option<String>,
    /// Direct `SourceLine` children only; the ones nested under `Class`,
    /// `Method` or `Field` describe the enclosing element, not the violation.
    #[serde(rename = "SourceLine", default)]
    pub(crate) source_lines: Vec<SourceLine>,
}

impl BugInstance {
    /// Human readable summary, preferring the long message.
    pub(crate) fn message(&self) -> &str {
        [self.long_message.as_deref(), self.short_message.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|message| !message.is_empty())
            .unwrap_or_default()
    }
}

/// Candidate location of a violation.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct SourceLine {
    #[serde(rename = "@classname", default)]
    pub(crate) class_name: Option<String>,
    #[serde(rename = "@sourcepath", default)]
    pub(crate) source_path: Option<String>,
    #[serde(rename = "@start", default)]
    pub(crate) start: Option<String>,
    #[serde(rename = "@end", default)]
    pub(crate) end: Option<String>,
    #[serde(rename = "@primary", default, deserialize_with = "flag_attribute")]
    pub(crate) primary: bool,
}

impl SourceLine {
    /// Whether the report gave this location a start line at all.
    pub(crate) fn has_start(&self) -> bool {
        line_attribute(self.start.as_deref()).is_some()
    }

    pub(crate) fn start_line(&self) -> Option<u32> {
        line_attribute(self.start.as_deref()).and_then(coerce_line)
    }

    pub(crate) fn end_line(&self) -> Option<u32> {
        line_attribute(self.end.as_deref()).and_then(coerce_line)
    }
}

/// Description of a bug pattern, shared by every violation of that type.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct BugPattern {
    #[serde(rename = "@type", default)]
    pub(crate) bug_type: String,
    /// HTML fragment explaining the pattern.
    #[serde(rename = "Details", default)]
    pub(crate) details: String,
}

/// Reads and parses a SpotBugs XML report from disk.
pub(crate) fn read_report(path: &Path) -> Result<BugCollection> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;
    parse_report(&content).with_context(|| format!("failed to parse report {}", path.display()))
}

/// Parses SpotBugs XML. Errors name the element path where parsing stopped.
pub(crate) fn parse_report(xml: &str) -> Result<BugCollection> {
    let mut deserializer = quick_xml::de::Deserializer::from_str(xml);
    let report: BugCollection = serde_path_to_error::deserialize(&mut deserializer)
        .context("report is not a well-formed SpotBugs XML document")?;
    Ok(report)
}

// A present attribute counts as set unless it says otherwise.
fn flag_attribute<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(!matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no"
    ))
}

fn line_attribute(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty() && *value != "0")
}

fn coerce_line(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|line| *line > 0)
}
