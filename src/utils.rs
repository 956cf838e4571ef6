use std::env;
use time::macros::format_description;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter = env::var("RUST_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: usize) -> String {
    num.to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.wait_secs == 0 {
        anyhow::bail!("--wait-secs must be greater than 0");
    }

    if args.batch_size == 0 {
        anyhow::bail!("--batch-size must be greater than 0");
    }

    if args.top == 0 {
        anyhow::bail!("--top must be greater than 0");
    }

    if args.live_timeout_secs == 0 {
        anyhow::bail!("--live-timeout-secs must be greater than 0");
    }

    if args.list_size == 0 {
        anyhow::bail!("--list-size must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Args;
    use clap::Parser;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_default_args_are_valid() {
        let args = Args::parse_from(["tranco-categorizer"]);
        assert_eq!(args.output.to_str(), Some("Tranco-categorizer.csv"));
        assert_eq!(args.wait_secs, 10);
        assert_eq!(args.batch_size, 1000);
        assert_eq!(args.live_timeout_secs, 5);
        assert!(!args.drop_last_attempted);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let args = Args::parse_from(["tranco-categorizer", "--batch-size", "0"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_check_live_takes_many_domains() {
        let args = Args::parse_from(["tranco-categorizer", "--check-live", "a.com", "b.org"]);
        assert_eq!(args.check_live, vec!["a.com", "b.org"]);
    }
}
