use std::collections::BTreeMap;

use html2text::render::TrivialDecorator;
use tracing::warn;

use crate::report::BugPattern;

/// Bug pattern descriptions keyed by pattern type.
pub(crate) struct PatternIndex<'a> {
    patterns: BTreeMap<&'a str, &'a BugPattern>,
}

impl<'a> PatternIndex<'a> {
    /// Indexes the catalog in one pass. A type listed twice keeps its last entry.
    pub(crate) fn build(patterns: &'a [BugPattern]) -> Self {
        let mut index = BTreeMap::new();
        for pattern in patterns {
            index.insert(pattern.bug_type.as_str(), pattern);
        }
        Self { patterns: index }
    }

    pub(crate) fn get(&self, bug_type: &str) -> Option<&'a BugPattern> {
        self.patterns.get(bug_type).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.patterns.len()
    }
}

/// Flattens the HTML details of a pattern into plain text.
///
/// Tags are dropped without any markup in their place, entities are decoded,
/// block elements end up on their own lines and nothing is re-wrapped.
pub(crate) fn render_details(details: &str) -> String {
    match html2text::from_read_with_decorator(
        details.as_bytes(),
        usize::MAX,
        TrivialDecorator::new(),
    ) {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            warn!("failed to render pattern details as text: {err}");
            details.trim().to_string()
        }
    }
}
