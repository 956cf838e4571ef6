use anyhow::{Context, Result};

/// One `rank,domain` row of a ranking list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedDomain {
    pub rank: u64,
    pub domain: String,
}

impl RankedDomain {
    /// Parses a raw ranking-list line. Trailing `\r`/`\n` and surrounding
    /// whitespace on the domain are ignored.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (rank, domain) = line
            .split_once(',')
            .with_context(|| format!("Ranking line has no domain field: {:?}", line))?;

        let rank = rank
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid rank in ranking line: {:?}", line))?;

        let domain = domain.trim();
        if domain.is_empty() {
            anyhow::bail!("Empty domain in ranking line: {:?}", line);
        }
        if !is_hostname(domain) {
            anyhow::bail!("Ranking line does not hold a hostname: {:?}", line);
        }

        Ok(Self {
            rank,
            domain: domain.to_string(),
        })
    }
}

/// Whether `domain` is a dotted hostname: labels of 1-63 ASCII letters,
/// digits or inner hyphens, and a top-level label that is not numeric.
pub fn is_hostname(domain: &str) -> bool {
    if domain.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });

    labels_ok && labels.last().is_some_and(|tld| !tld.bytes().all(|b| b.is_ascii_digit()))
}
