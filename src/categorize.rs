use anyhow::{Context, Result};
use dialoguer::Input;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use url::Url;

use crate::browser::{BrowserOptions, ChromeCategorizer};
use crate::category::{CategorySource, LookupError, LookupOutcome};
use crate::checkpoint::{self, LastAttempt};
use crate::domain::RankedDomain;
use crate::output::{self, CategoryWriter};
use crate::stats::{RunStats, StopReason};
use crate::tranco::TrancoClient;
use crate::Args;

/// Asked every batch whether the run should stop.
pub trait StopPrompt {
    fn should_stop(&mut self, processed: usize) -> Result<bool>;
}

impl<F> StopPrompt for F
where
    F: FnMut(usize) -> Result<bool>,
{
    fn should_stop(&mut self, processed: usize) -> Result<bool> {
        self(processed)
    }
}

/// Asks on the terminal. Only an exact `y` stops the run.
pub struct ConsolePrompt;

impl StopPrompt for ConsolePrompt {
    fn should_stop(&mut self, _processed: usize) -> Result<bool> {
        let answer: String = Input::new()
            .with_prompt("[?] Wanna stop categorizing?")
            .allow_empty(true)
            .interact_text()?;
        Ok(answer == "y")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Prompt interval; `None` never prompts.
    pub batch_size: Option<usize>,
    pub last_attempt: LastAttempt,
}

/// State of one categorization run. The ranking list is rewritten with the
/// remaining work when the run is finished, or when the context is dropped
/// without finishing. The category source is released after that.
pub struct RunContext<S: CategorySource> {
    list_path: PathBuf,
    ranking: Vec<String>,
    seen: Vec<String>,
    done: HashSet<String>,
    writer: CategoryWriter,
    config: RunConfig,
    stats: RunStats,
    checkpointed: bool,
    source: S,
}

impl<S: CategorySource> RunContext<S> {
    pub fn open(source: S, list_path: &Path, output_path: &Path, config: RunConfig) -> Result<Self> {
        let content = fs::read_to_string(list_path)
            .with_context(|| format!("Failed to read ranking list {:?}", list_path))?;
        let ranking: Vec<String> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        println!("[-] Found {} domains", ranking.len());

        if output::ensure_output(output_path)? {
            println!("[+] Created {} file", output_path.display());
        }

        let done = output::load_done_domains(output_path)?;
        println!("[-] {} domains already categorized", done.len());

        let writer = CategoryWriter::open(output_path)?;

        Ok(Self {
            list_path: list_path.to_path_buf(),
            ranking,
            seen: Vec::new(),
            done,
            writer,
            config,
            stats: RunStats::new(),
            checkpointed: false,
            source,
        })
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Walks the ranking list until it is exhausted, the operator stops the
    /// run, `interrupted` is raised or an error occurs.
    pub fn process(&mut self, prompt: &mut dyn StopPrompt, interrupted: &AtomicBool) -> Result<StopReason> {
        let result = self.process_lines(prompt, interrupted);
        self.stats.stop_reason = Some(match &result {
            Ok(reason) => *reason,
            Err(_) => StopReason::Error,
        });
        result
    }

    fn process_lines(&mut self, prompt: &mut dyn StopPrompt, interrupted: &AtomicBool) -> Result<StopReason> {
        println!("[+] categorizing websites...");

        for index in 0..self.ranking.len() {
            if interrupted.load(Ordering::SeqCst) {
                return Ok(StopReason::Interrupted);
            }

            let line = self.ranking[index].clone();
            self.seen.push(line.clone());

            let entry = match RankedDomain::parse(&line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(action = "parse", component = "ranking_list", error = %e, "Skipping malformed ranking line");
                    self.stats.malformed += 1;
                    continue;
                }
            };

            if self.done.contains(&entry.domain) {
                println!("[-] Skipping {}", entry.domain);
                self.stats.skipped += 1;
                continue;
            }

            let start_time = Instant::now();
            let outcome = self.source.lookup(&entry.domain);

            // An interrupt also reaches the browser; its failure says nothing about the domain.
            if interrupted.load(Ordering::SeqCst) && matches!(outcome, LookupOutcome::Failed(_)) {
                warn!(action = "lookup", component = "categorizer", domain = %entry.domain, "Lookup cut off by interrupt, not recording");
                self.seen.pop();
                return Ok(StopReason::Interrupted);
            }

            // Only lines with an output row may leave the ranking list.
            let field = match self.writer.append(&entry.domain, outcome.categories()) {
                Ok(field) => field,
                Err(e) => {
                    self.seen.pop();
                    return Err(e);
                }
            };
            self.count_outcome(&outcome);
            self.done.insert(entry.domain.clone());
            self.stats.processed += 1;

            info!(
                action = "categorize",
                component = "categorizer",
                rank = entry.rank,
                domain = %entry.domain,
                categories = %field,
                duration_ms = start_time.elapsed().as_millis(),
                "Domain categorized"
            );
            println!("[+] {}: {}", self.stats.processed, entry.domain);

            if let Some(batch_size) = self.config.batch_size {
                if self.stats.processed % batch_size == 0 && prompt.should_stop(self.stats.processed)? {
                    return Ok(StopReason::OperatorStopped);
                }
            }
        }

        Ok(StopReason::Exhausted)
    }

    fn count_outcome(&mut self, outcome: &LookupOutcome) {
        match outcome {
            LookupOutcome::Categorized(_) => self.stats.categorized += 1,
            LookupOutcome::Uncategorized => self.stats.uncategorized += 1,
            LookupOutcome::Failed(LookupError::TimedOut { .. }) => self.stats.timed_out += 1,
            LookupOutcome::Failed(_) => self.stats.failed += 1,
        }
    }

    fn checkpoint(&mut self) -> Result<usize> {
        self.checkpointed = true;
        checkpoint::write_residual(&self.list_path, &self.ranking, &self.seen, self.config.last_attempt)
    }

    /// Writes the checkpoint and returns the run statistics.
    pub fn finish(mut self) -> Result<RunStats> {
        self.stats.remaining = self.checkpoint()?;
        self.stats.finished_at = Some(chrono::Local::now());
        Ok(self.stats.clone())
    }
}

impl<S: CategorySource> Drop for RunContext<S> {
    fn drop(&mut self) {
        if !self.checkpointed {
            if let Err(e) = self.checkpoint() {
                error!(action = "checkpoint", component = "ranking_list", error = %e, "Failed to save remaining domains");
            }
        }
    }
}

pub fn run_categorizer(args: &Args, interrupted: &AtomicBool) -> Result<RunStats> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "categorizer", "Starting categorization run");

    let tranco = TrancoClient::new(&args.tranco_url, &args.cache_dir, args.list_size)?;
    let list = match &args.list_id {
        Some(list_id) => tranco.list_for_id(list_id)?,
        None => tranco.latest_list()?,
    };
    info!(action = "resolve", component = "tranco", list_id = %list.list_id, path = ?list.path, "Ranking list ready");

    let lookup_url = Url::parse(&args.lookup_url)
        .with_context(|| format!("Invalid lookup URL: {}", args.lookup_url))?;
    let source = ChromeCategorizer::launch(BrowserOptions {
        lookup_url,
        wait: Duration::from_secs(args.wait_secs),
        headless: args.headless,
    })?;

    let config = RunConfig {
        batch_size: (!args.no_prompt).then_some(args.batch_size),
        last_attempt: if args.drop_last_attempted {
            LastAttempt::Drop
        } else {
            LastAttempt::Retain
        },
    };

    let mut context = RunContext::open(source, &list.path, &args.output, config)?;
    match context.process(&mut ConsolePrompt, interrupted) {
        Ok(StopReason::Interrupted) => println!("\n[!] Interrupted by user."),
        Ok(_) => {}
        Err(e) => {
            error!(action = "process", component = "categorizer", error = %format!("{:#}", e), "Run stopped by error");
            println!("[!] Exception: {:#}", e);
        }
    }
    let stats = context.finish()?;

    info!(
        action = "complete",
        component = "categorizer",
        processed = stats.processed,
        duration_ms = total_start_time.elapsed().as_millis(),
        "Categorization run finished"
    );
    Ok(stats)
}
