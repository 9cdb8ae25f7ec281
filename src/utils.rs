//! Utility functions for candidate lists.

use crate::proxy::Candidate;

use log::debug;
use std::collections::HashSet;

/// Parse text content into candidates, one `host:port` per line.
///
/// Blank lines, `#` comments and unparsable lines are skipped. Duplicates are
/// dropped, keeping the first occurrence.
pub fn parse_candidate_list(content: &str) -> Vec<Candidate> {
    let candidates = content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        match line.parse::<Candidate>() {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!("Skipping line: {}", e);
                None
            }
        }
    });
    dedup_in_order(candidates)
}

/// Remove duplicate candidates while preserving first-seen order.
pub(crate) fn dedup_in_order(candidates: impl IntoIterator<Item = Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
