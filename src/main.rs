use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pathlimit::config::{LogConfig, PathlimitConfig};
use pathlimit::ratelimit::{PathLimit, RuleSet};

/// Inspect and validate path-matched rate limit rules.
#[derive(Debug, Parser)]
#[command(name = "pathlimit", version)]
struct Cli {
    /// Settings file (YAML); `PATHLIMIT_*` variables override it
    #[arg(long, global = true)]
    config: Option<String>,

    /// Rules file, overriding `rules_path` from the settings
    #[arg(long, global = true)]
    rules: Option<String>,

    /// Log filter directive, e.g. `debug` or `pathlimit=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse every window and compile every pattern in the rules file
    Check,
    /// Show which rule governs a request path
    Match {
        /// Normalized request path, e.g. `/api/v2/users`
        path: String,
        /// Show every matching rule instead of only the first
        #[arg(long)]
        all: bool,
        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },
}

/// One rule as reported on the command line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleReport<'a> {
    index: usize,
    key: Option<&'a str>,
    window_seconds: u64,
    max_requests: i64,
}

impl<'a> RuleReport<'a> {
    fn new(index: usize, rule: &'a impl PathLimit) -> anyhow::Result<Self> {
        Ok(Self {
            index,
            key: rule.path_key(),
            window_seconds: rule.window_seconds()?,
            max_requests: rule.max_requests(),
        })
    }
}

impl std::fmt::Display for RuleReport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} key={} window={}s max_requests={}",
            self.index,
            self.key.unwrap_or("-"),
            self.window_seconds,
            self.max_requests
        )
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = PathlimitConfig::load(cli.config.as_deref())
        .context("Failed to load pathlimit settings")?;
    if let Some(level) = cli.log_level.clone() {
        config.log.level = level;
    }
    if cli.json_logs {
        config.log.json = true;
    }
    init_tracing(&config.log);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting pathlimit");

    let Some(rules_path) = cli.rules.or(config.rules_path) else {
        bail!("No rules file given; pass --rules or set PATHLIMIT_RULES_PATH");
    };
    let rules = RuleSet::from_file(&rules_path)
        .with_context(|| format!("Failed to load rules from {}", rules_path))?;
    debug!(count = rules.len(), "Rules loaded");

    match cli.command {
        Command::Check => check(&rules),
        Command::Match { path, all, json } => show_matches(&rules, &path, all, json),
    }
}

fn init_tracing(log: &LogConfig) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn check(rules: &RuleSet) -> anyhow::Result<()> {
    rules.validate()?;
    for (index, rule) in rules.iter().enumerate() {
        println!("{}", RuleReport::new(index, rule)?);
    }
    info!(count = rules.len(), "All rules are valid");
    Ok(())
}

fn show_matches(rules: &RuleSet, path: &str, all: bool, json: bool) -> anyhow::Result<()> {
    let matched = if all {
        rules.matching(path)?
    } else {
        rules.find_match(path)?.into_iter().collect()
    };
    let reports = matched
        .into_iter()
        .map(|(index, rule)| RuleReport::new(index, rule))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else if reports.is_empty() {
        println!("no rule matches {}", path);
    } else {
        for report in &reports {
            println!("{}", report);
        }
    }
    Ok(())
}
