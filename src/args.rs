use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_LOOKUP_URL: &str =
    "https://sitelookup.mcafee.com/en/feedback/url?action=checksingle";

#[derive(Parser, Debug)]
#[command(
    name = "tranco-categorizer",
    about = "Categorize Tranco-ranked domains using a web categorization lookup service",
    version,
    long_about = None
)]
pub struct Args {
    /// Output CSV file (domain,categories)
    #[arg(short, long, default_value = "Tranco-categorizer.csv")]
    pub output: PathBuf,

    /// Directory holding cached ranking lists
    #[arg(long, default_value = ".tranco")]
    pub cache_dir: PathBuf,

    /// Use a specific ranking list instead of the latest one
    #[arg(long)]
    pub list_id: Option<String>,

    /// Number of ranked domains to download
    #[arg(long, default_value_t = 1_000_000)]
    pub list_size: usize,

    /// Base URL of the ranking list provider
    #[arg(long, default_value = "https://tranco-list.eu")]
    pub tranco_url: String,

    /// Categorization lookup page (the domain is passed as the `url` query argument)
    #[arg(long, default_value = DEFAULT_LOOKUP_URL)]
    pub lookup_url: String,

    /// Seconds to wait for each page element during a lookup
    #[arg(long, default_value_t = 10)]
    pub wait_secs: u64,

    /// Ask whether to stop after this many categorized domains
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,

    /// Never prompt, run until the list is exhausted or interrupted
    #[arg(long)]
    pub no_prompt: bool,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Also remove the last attempted domain from the cached list on exit
    #[arg(long)]
    pub drop_last_attempted: bool,

    /// Check whether the given domains answer over HTTPS and exit
    #[arg(long, num_args = 1.., value_name = "DOMAIN")]
    pub check_live: Vec<String>,

    /// Timeout in seconds for liveness checks
    #[arg(long, default_value_t = 5)]
    pub live_timeout_secs: u64,

    /// Print a category summary of the output file and exit
    #[arg(long)]
    pub summary: bool,

    /// Number of most frequent categories to show with --summary
    #[arg(short, long, default_value_t = 20)]
    pub top: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
