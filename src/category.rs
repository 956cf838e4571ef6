//! Category lookup results and the text cleanup applied to them.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which element a lookup was waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    Confirm,
    Results,
}

impl fmt::Display for LookupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupStage::Confirm => f.write_str("confirm button"),
            LookupStage::Results => f.write_str("results cell"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("timed out after {timeout:?} waiting for the {stage}")]
    TimedOut {
        stage: LookupStage,
        timeout: Duration,
    },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("interacting with the {stage} failed: {message}")]
    Interaction { stage: LookupStage, message: String },
}

#[derive(Debug)]
pub enum LookupOutcome {
    /// Labels as parsed from the results cell, possibly with empty entries.
    Categorized(Vec<String>),
    /// The results cell was rendered but carried no label.
    Uncategorized,
    Failed(LookupError),
}

impl LookupOutcome {
    /// Builds the outcome for the raw text of a results cell.
    pub fn from_result_text(text: &str) -> Self {
        let labels = parse_category_text(text);
        if labels.iter().all(|label| label.is_empty()) {
            LookupOutcome::Uncategorized
        } else {
            LookupOutcome::Categorized(labels)
        }
    }

    /// Labels to record. Anything other than a categorized result records none.
    pub fn categories(&self) -> &[String] {
        match self {
            LookupOutcome::Categorized(labels) => labels,
            LookupOutcome::Uncategorized | LookupOutcome::Failed(_) => &[],
        }
    }
}

/// Anything that can categorize a single domain.
pub trait CategorySource {
    fn lookup(&mut self, domain: &str) -> LookupOutcome;
}

/// Splits results-cell text into labels: hyphens removed, one label per
/// line, each trimmed. Empty labels are kept.
pub fn parse_category_text(text: &str) -> Vec<String> {
    text.replace('-', "")
        .split('\n')
        .map(|label| label.trim().to_string())
        .collect()
}

/// Pipe-delimited category field with empty labels dropped, so no leading,
/// doubled or trailing pipes survive.
pub fn join_categories(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| label.as_str())
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}
