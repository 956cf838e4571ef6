//! Residual work file: the cached ranking list rewritten on exit so that it
//! only holds the lines a run has not reached yet.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// What happens to the most recently seen line when the list is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastAttempt {
    /// Keep it, so the next run attempts it again. A lookup that was cut off
    /// by an interrupt is then retried; a completed one is caught by the
    /// output skip-set.
    #[default]
    Retain,
    /// Remove every seen line, including the last one.
    Drop,
}

/// Lines of `ranking` that are not excluded by `seen`. Exclusion is by line
/// content, so duplicate lines share a fate.
pub fn residual_lines<'a>(ranking: &'a [String], seen: &[String], policy: LastAttempt) -> Vec<&'a str> {
    let excluded = match policy {
        LastAttempt::Retain => &seen[..seen.len().saturating_sub(1)],
        LastAttempt::Drop => seen,
    };
    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();

    ranking
        .iter()
        .map(String::as_str)
        .filter(|line| !excluded.contains(line))
        .collect()
}

/// Rewrites the ranking list at `path` with the residual lines. Returns the
/// number of lines kept.
pub fn write_residual(path: &Path, ranking: &[String], seen: &[String], policy: LastAttempt) -> Result<usize> {
    let residual = residual_lines(ranking, seen, policy);

    let mut content = String::new();
    for line in &residual {
        content.push_str(line);
        content.push('\n');
    }

    let partial = path.with_extension("csv.part");
    fs::write(&partial, content).with_context(|| format!("Failed to write {:?}", partial))?;
    fs::rename(&partial, path).with_context(|| format!("Failed to replace {:?}", path))?;

    info!(
        action = "checkpoint",
        component = "ranking_list",
        path = ?path,
        remaining = residual.len(),
        removed = ranking.len() - residual.len(),
        "Rewrote ranking list with remaining domains"
    );
    Ok(residual.len())
}
