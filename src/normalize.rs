use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::locator::SourceIndex;
use crate::report::{BugInstance, SourceLine};

/// Bare name used when the primary source line carries no `sourcepath`.
const MISSING_SOURCE_PATH: &str = "null";

/// Why a violation produced no annotation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum SkipReason {
    NoSourceLine,
    MissingStartLine,
    SourceFileNotFound { file_name: String },
    UnknownPattern { bug_type: String },
}

impl SkipReason {
    /// Reasons that point at an inconsistent report rather than a missing checkout.
    pub(crate) fn is_report_defect(&self) -> bool {
        matches!(self, SkipReason::UnknownPattern { .. })
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSourceLine => write!(f, "no source line reported"),
            SkipReason::MissingStartLine => write!(f, "primary source line has no start line"),
            SkipReason::SourceFileNotFound { file_name } => {
                write!(f, "no source file named {file_name} under the source root")
            }
            SkipReason::UnknownPattern { bug_type } => {
                write!(f, "no bug pattern description for {bug_type}")
            }
        }
    }
}

/// Location chosen for a violation.
#[derive(Debug)]
pub(crate) struct ResolvedLocation<'a> {
    /// `None` only when the source check is skipped and nothing matched.
    pub(crate) source_file: Option<PathBuf>,
    pub(crate) source_line: &'a SourceLine,
}

/// Picks the reported location of a violation and resolves it to a file.
pub(crate) fn normalize<'a>(
    bug: &'a BugInstance,
    sources: &SourceIndex,
    skip_source_check: bool,
) -> Result<ResolvedLocation<'a>, SkipReason> {
    let source_line = primary_source_line(&bug.source_lines).ok_or(SkipReason::NoSourceLine)?;
    if !source_line.has_start() {
        return Err(SkipReason::MissingStartLine);
    }

    let file_name = bare_file_name(source_line.source_path.as_deref());
    let candidates = sources.candidates(file_name);
    if candidates.len() > 1 {
        warn!(
            "resolved {} source files for {}, using {}",
            candidates.len(),
            file_name,
            candidates[0].display()
        );
    }
    match candidates.first() {
        Some(source_file) => Ok(ResolvedLocation {
            source_file: Some(source_file.clone()),
            source_line,
        }),
        None if skip_source_check => {
            debug!(
                "no source file for {} ({}), keeping it because the source check is skipped",
                file_name,
                source_line.class_name.as_deref().unwrap_or("unknown class")
            );
            Ok(ResolvedLocation {
                source_file: None,
                source_line,
            })
        }
        None => Err(SkipReason::SourceFileNotFound {
            file_name: file_name.to_string(),
        }),
    }
}

/// With several candidates the flagged one wins; otherwise the first is used.
pub(crate) fn primary_source_line(source_lines: &[SourceLine]) -> Option<&SourceLine> {
    if source_lines.len() > 1 {
        if let Some(primary) = source_lines.iter().find(|line| line.primary) {
            return Some(primary);
        }
    }
    source_lines.first()
}

/// Last path component, splitting on both `/` and `\`.
pub(crate) fn bare_file_name(source_path: Option<&str>) -> &str {
    match source_path {
        Some(path) => path
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(path),
        None => MISSING_SOURCE_PATH,
    }
}
