//! aging: filter backup pathnames through a retention policy.
//!
//! Use `--keep` or `--discard` to list the pathnames a policy keeps or
//! deletes, or `--print` to show the reason for every decision.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{CommandFactory, Parser};
use common::cli::{CommonArgs, utils};
use retention::{BackupCollector, RetentionPolicy, Verdict};
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use tracing::{debug, info};

const RETENTION_HELP: &str = "\
RETENTION:
Specify retention filters in terms of year/month/week/day/hour file ages
using a single letter postfix, and via the keywords `none`, `latest`, `all`.
Multiple policies can be combined by using space as a separator. Detailed
policy syntax: `no|<number>{y|m|w|d|h}|latest|all`, where `*` as number
keeps every period.";

#[derive(Parser, Debug)]
#[command(name = "aging", version, about, long_about = None, after_help = RETENTION_HELP)]
struct Cli {
    /// List all filenames to be kept
    #[arg(short, long, value_name = "RETENTION")]
    keep: Option<String>,

    /// List all filenames to be discarded
    #[arg(short, long, value_name = "RETENTION")]
    discard: Option<String>,

    /// Print retention reason
    #[arg(short, long, value_name = "RETENTION")]
    print: Option<String>,

    /// Emit the --print report as JSON
    #[arg(long, requires = "print")]
    json: bool,

    /// Reference time instead of the wall clock, e.g. 2024-03-15T12:00
    #[arg(long, value_name = "DATETIME", value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    #[command(flatten)]
    common: CommonArgs,

    /// Backup pathnames to classify
    pathnames: Vec<String>,
}

/// JSON document written by `--print --json`.
#[derive(Serialize)]
struct PrintReport {
    policy: String,
    now: NaiveDateTime,
    files: Vec<Verdict>,
}

fn parse_now(value: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok_or_else(|| format!("invalid date-time '{value}', expected YYYY-MM-DDTHH:MM[:SS]"))
}

/// A policy given as an empty string counts as not given.
fn policy_arg(arg: &Option<String>) -> Option<&str> {
    arg.as_deref().filter(|p| !p.is_empty())
}

impl Cli {
    fn run(self) -> Result<()> {
        utils::init_logging(&self.common);

        let modes = [
            policy_arg(&self.keep),
            policy_arg(&self.discard),
            policy_arg(&self.print),
        ];
        if modes.iter().all(Option::is_none) {
            println!("{}", Cli::command().render_usage());
            return Ok(());
        }

        let config = utils::load_config(self.common.config.as_ref())?;
        let week_anchor = config.retention.week_anchor()?;
        let now = match self.now {
            Some(now) => now,
            None => config
                .retention
                .wall_clock_now()
                .context("Failed to read the wall clock")?,
        };
        debug!(%now, ?week_anchor, "Reference instant for retention slots");

        let collect = |text: &str| {
            let policy = RetentionPolicy::parse(text).with_week_anchor(week_anchor);
            if policy.is_empty() {
                info!(policy = %text, "Retention policy has no recognized words");
            }
            let mut collector = BackupCollector::new(policy, now);
            let recognized = collector.collect(&self.pathnames);
            info!(
                policy = %collector.policy(),
                pathnames = self.pathnames.len(),
                recognized,
                slots = collector.lattice().total_slots(),
                "Collected backups"
            );
            collector
        };

        let mut out = BufWriter::new(io::stdout().lock());

        if let Some(text) = policy_arg(&self.keep) {
            let collector = collect(text);
            for name in collector.keep(&self.pathnames) {
                writeln!(out, "{name}")?;
            }
        }

        if let Some(text) = policy_arg(&self.discard) {
            let collector = collect(text);
            for name in collector.discard(&self.pathnames) {
                writeln!(out, "{name}")?;
            }
        }

        if let Some(text) = policy_arg(&self.print) {
            let collector = collect(text);
            let files = collector.report(&self.pathnames);
            if self.json {
                let report = PrintReport {
                    policy: collector.policy().to_string(),
                    now,
                    files,
                };
                serde_json::to_writer_pretty(&mut out, &report)
                    .context("Failed to serialize report to JSON")?;
                writeln!(out)?;
            } else {
                writeln!(out, "{:<15} {}", "Retaining:", collector.policy())?;
                for verdict in files {
                    writeln!(out, "{:<15} {}", verdict.classification.label(), verdict.name)?;
                }
            }
        }

        out.flush().context("Failed to write output")?;
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run() {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}
