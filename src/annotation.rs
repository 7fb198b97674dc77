use std::path::{Component, Path};

use serde::Serialize;
use tracing::info;

use crate::normalize::{ResolvedLocation, SkipReason};
use crate::patterns::{PatternIndex, render_details};
use crate::report::BugInstance;

/// Severity of an annotation. SpotBugs findings are always reported as warnings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AnnotationLevel {
    Warning,
}

/// Source annotation in the shape code review check runs expect.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct Annotation {
    pub(crate) annotation_level: AnnotationLevel,
    /// Relative to the source root with `/` separators; empty when the file
    /// was not found and the source check is skipped.
    pub(crate) path: String,
    pub(crate) start_line: u32,
    pub(crate) end_line: u32,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) raw_details: String,
}

/// Builds the annotation for a resolved violation.
pub(crate) fn build_annotation(
    bug: &BugInstance,
    resolved: &ResolvedLocation<'_>,
    patterns: &PatternIndex<'_>,
    root: &Path,
) -> Result<Annotation, SkipReason> {
    let pattern = patterns
        .get(&bug.bug_type)
        .ok_or_else(|| SkipReason::UnknownPattern {
            bug_type: bug.bug_type.clone(),
        })?;

    let path = resolved
        .source_file
        .as_deref()
        .map(|source_file| relative_path(root, source_file))
        .unwrap_or_default();
    let source_line = resolved.source_line;
    let start_line = source_line.start_line().unwrap_or(1);
    let end_line = source_line
        .end_line()
        .or_else(|| source_line.start_line())
        .unwrap_or(1)
        .max(start_line);

    let annotation = Annotation {
        annotation_level: AnnotationLevel::Warning,
        path,
        start_line,
        end_line,
        title: bug.bug_type.clone(),
        message: bug.message().to_string(),
        raw_details: render_details(&pattern.details),
    };
    info!(
        "created annotation {} with message {}",
        annotation.title, annotation.message
    );
    Ok(annotation)
}

fn relative_path(root: &Path, source_file: &Path) -> String {
    source_file
        .strip_prefix(root)
        .unwrap_or(source_file)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
