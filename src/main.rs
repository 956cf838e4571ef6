use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, warn};
use tranco_categorizer::{
    domain::is_hostname, liveness::LivenessChecker, output, run_categorizer, stats, utils, Args,
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn check_live(args: &Args) -> anyhow::Result<()> {
    let checker = LivenessChecker::new(Duration::from_secs(args.live_timeout_secs))?;
    for domain in &args.check_live {
        if !is_hostname(domain) {
            warn!(action = "validate", component = "liveness", domain = %domain, "Domain does not look valid");
        }
        println!("{}: {}", domain, checker.is_live(domain));
    }
    Ok(())
}

fn summarize_output(args: &Args) -> anyhow::Result<()> {
    let map = output::load_category_map(&args.output)?;
    let summary = output::summarize(&map);
    output::print_summary(&args.output, &summary, args.top);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    if !args.check_live.is_empty() {
        return check_live(&args);
    }

    if args.summary {
        return summarize_output(&args);
    }

    // The run loop notices the flag before the next domain and checkpoints.
    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst)).unwrap_or_else(|e| {
        warn!(action = "setup", component = "signals", error = %e, "Failed to set Ctrl-C handler");
    });

    let result = run_categorizer(&args, &INTERRUPTED);
    match &result {
        Ok(run_stats) => stats::print_run_summary(run_stats),
        Err(e) => {
            error!(action = "run", component = "categorizer", error = %format!("{:#}", e), "Categorization failed");
            println!("[!] Exception: {:#}", e);
        }
    }
    println!("[x] Process Finished.");

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
