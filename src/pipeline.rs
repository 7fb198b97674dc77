use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use crate::annotation::{Annotation, build_annotation};
use crate::locator::SourceIndex;
use crate::normalize::normalize;
use crate::patterns::PatternIndex;
use crate::report::{BugCollection, read_report};

/// Settings fixed for the duration of a run.
#[derive(Clone, Debug)]
pub(crate) struct PipelineConfig {
    /// Directory searched for source files and used as the base of annotation paths.
    pub(crate) root: PathBuf,
    /// Keep violations whose source file cannot be found. Meant for tests and
    /// for environments without a checkout.
    pub(crate) skip_source_check: bool,
}

impl PipelineConfig {
    /// An empty root means the current directory.
    pub(crate) fn new(root: impl Into<PathBuf>, skip_source_check: bool) -> Self {
        let root = root.into();
        let root = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        Self {
            root,
            skip_source_check,
        }
    }
}

/// Converts one SpotBugs report into annotations.
///
/// Fails only when the report cannot be read or parsed, or when the source
/// root is unusable. Individual violations that cannot be resolved are logged
/// and left out.
pub(crate) fn run(report_path: &Path, config: &PipelineConfig) -> Result<Vec<Annotation>> {
    let span = info_span!("report", path = %report_path.display());
    let _guard = span.enter();

    info!("creating annotations for {}", report_path.display());
    let report = read_report(report_path)?;
    ensure_source_root(&config.root)?;
    if config.skip_source_check {
        warn!("source file check is disabled, this should only be used for testing");
    }
    let sources = SourceIndex::scan(&config.root);
    Ok(annotate(&report, config, &sources))
}

/// Resolves every violation of an already parsed report, in report order.
pub(crate) fn annotate(
    report: &BugCollection,
    config: &PipelineConfig,
    sources: &SourceIndex,
) -> Vec<Annotation> {
    let patterns = PatternIndex::build(&report.bug_patterns);
    info!(
        "report has {} violations, {} bug patterns, {} files under {}",
        report.bug_instances.len(),
        patterns.len(),
        sources.file_count(),
        config.root.display()
    );

    let mut annotations = Vec::with_capacity(report.bug_instances.len());
    let mut skipped = 0;
    for bug in &report.bug_instances {
        let outcome = normalize(bug, sources, config.skip_source_check)
            .and_then(|resolved| build_annotation(bug, &resolved, &patterns, &config.root));
        match outcome {
            Ok(annotation) => annotations.push(annotation),
            Err(reason) => {
                skipped += 1;
                if reason.is_report_defect() {
                    warn!("skipping bug instance {}: {reason}", bug.bug_type);
                } else {
                    info!("skipping bug instance {}: {reason}", bug.bug_type);
                }
            }
        }
    }
    info!(
        "created {} annotations, skipped {} bug instances",
        annotations.len(),
        skipped
    );
    annotations
}

fn ensure_source_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root)
        .with_context(|| format!("source root {} is not accessible", root.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("source root {} is not a directory", root.display());
    }
    fs::read_dir(root)
        .with_context(|| format!("failed to read source root {}", root.display()))?;
    Ok(())
}
