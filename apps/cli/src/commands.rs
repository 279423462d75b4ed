//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use alignwatch_client::{ArtifactFetcher, HttpJobApi};
use alignwatch_core::{
    JobPoller, PollOutcome, PollProgress, ResultSession, SectionState,
};
use alignwatch_highlight::{CopyFeedback, frames_to_fasta, highlight};
use alignwatch_shared::{
    AppConfig, ClientConfig, JobId, PollConfig, PollingConfig, ReportedStatus, init_config,
    load_config,
};

use crate::render;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// alignwatch: follow alignment jobs and browse their results.
#[derive(Parser)]
#[command(
    name = "alignwatch",
    version,
    about = "Follow alignment jobs to completion and browse their results.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Results server base URL (overrides the config file).
    #[arg(long, env = "ALIGNWATCH_BASE_URL", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Poll a job until it finishes, then print its results.
    Watch {
        /// Job id returned by the submission endpoint.
        job_id: String,

        /// Input sequence to show (defaults to the first submitted).
        #[arg(short, long)]
        input: Option<String>,

        /// Target whose hits to show (defaults to the first available).
        #[arg(short, long)]
        target: Option<String>,

        #[command(flatten)]
        polling: PollOverrides,
    },

    /// Print the highlighted reading frames of one input.
    Frames {
        job_id: String,
        input: String,

        /// Print the frames as FASTA instead.
        #[arg(long)]
        fasta: bool,
    },

    /// Print the ranked hits of one target.
    Hits { job_id: String, target: String },

    /// Highlight ORFs in a sequence locally, without a server.
    Highlight {
        sequence: String,

        /// ORF substrings to highlight.
        #[arg(required = true)]
        orfs: Vec<String>,

        /// Print the text of span N (1-based) on the last line, for piping.
        #[arg(long)]
        copy: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Poll schedule flags; each one overrides the config file value.
#[derive(Debug, Default, clap::Args)]
pub(crate) struct PollOverrides {
    /// Delay before the first status check, in milliseconds.
    #[arg(long)]
    warmup_delay_ms: Option<u64>,

    /// Initial delay between status checks, in milliseconds.
    #[arg(long)]
    base_delay_ms: Option<u64>,

    /// Upper bound on the delay between status checks, in milliseconds.
    #[arg(long)]
    max_delay_ms: Option<u64>,
}

impl PollOverrides {
    fn apply(&self, polling: &mut PollingConfig) {
        if let Some(ms) = self.warmup_delay_ms {
            polling.warmup_delay_ms = ms;
        }
        if let Some(ms) = self.base_delay_ms {
            polling.base_delay_ms = ms;
        }
        if let Some(ms) = self.max_delay_ms {
            polling.max_delay_ms = ms;
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "alignwatch=info",
        1 => "alignwatch=debug",
        _ => "alignwatch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so results on stdout stay pipeable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let base_url = cli.base_url;
    match cli.command {
        Command::Watch {
            job_id,
            input,
            target,
            polling,
        } => {
            let mut config = resolved_config(base_url.as_deref())?;
            polling.apply(&mut config.polling);
            cmd_watch(&config, &job_id, input.as_deref(), target.as_deref()).await
        }
        Command::Frames {
            job_id,
            input,
            fasta,
        } => cmd_frames(&resolved_config(base_url.as_deref())?, &job_id, &input, fasta).await,
        Command::Hits { job_id, target } => {
            cmd_hits(&resolved_config(base_url.as_deref())?, &job_id, &target).await
        }
        Command::Highlight {
            sequence,
            orfs,
            copy,
        } => cmd_highlight(&resolved_config(None)?, &sequence, &orfs, copy),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(base_url.as_deref()),
        },
    }
}

/// Config file values with command-line overrides applied.
fn resolved_config(base_url: Option<&str>) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(url) = base_url {
        config.server.base_url = url.to_string();
    }
    Ok(config)
}

fn fetcher(config: &AppConfig) -> Result<ArtifactFetcher> {
    let api = HttpJobApi::new(ClientConfig::from_app(config)?)?;
    Ok(ArtifactFetcher::new(Arc::new(api)))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_watch(
    config: &AppConfig,
    job_id: &str,
    input: Option<&str>,
    target: Option<&str>,
) -> Result<()> {
    let job_id: JobId = job_id.parse()?;
    let fetcher = fetcher(config)?;
    let mut poller = JobPoller::new(fetcher.clone(), job_id.clone(), PollConfig::from(&config.polling))?;

    // Ctrl-C stops polling; the guard stops it if we bail out early.
    let canceller = poller.canceller();
    let _guard = canceller.guard();
    let on_interrupt = canceller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    info!(%job_id, server = %config.server.base_url, "watching job");
    let progress = CliPoll::new(&job_id);
    let view = match poller.run(&progress).await {
        PollOutcome::Completed(view) => view,
        PollOutcome::AssemblyFailed(e) => return Err(e.into()),
        PollOutcome::Failed(failure) => return Err(eyre!("job {job_id} failed: {failure}")),
        PollOutcome::Cancelled => {
            println!("Stopped watching job {job_id}.");
            return Ok(());
        }
    };

    let mut session = ResultSession::new(view, fetcher);
    if let Some(input) = input {
        session.select_input(input)?;
    }
    if let Some(target) = target {
        session.select_target(target)?;
    }

    println!();
    let Some(selected) = session.selected_input().map(str::to_string) else {
        println!("Job {job_id} completed with no alignment results.");
        return Ok(());
    };
    if let Some(result) = session.selected_alignment() {
        print!("{}", render::alignment(&selected, result));
    }
    let others: Vec<_> = session
        .view()
        .input_names()
        .filter(|name| *name != selected)
        .collect();
    if !others.is_empty() {
        println!("  Other inputs: {}", others.join(", "));
    }

    println!();
    println!("Reading frames");
    print_section(session.frames_for(&selected).await, |frames| {
        render::frames(frames)
    });

    if let Some(target) = session.selected_target().map(str::to_string) {
        println!();
        print_section(session.hits_for(&target).await, |rows| {
            render::hits(&target, rows)
        });
    }

    if let Some(links) = &session.view().download_links {
        println!();
        print!("{}", render::download_links(links));
    }

    for warning in &session.view().warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

async fn cmd_frames(config: &AppConfig, job_id: &str, input: &str, fasta: bool) -> Result<()> {
    let job_id: JobId = job_id.parse()?;
    let frames = fetcher(config)?.frames_for_input(&job_id, input).await?;
    if fasta {
        println!("{}", frames_to_fasta(&frames));
    } else {
        println!("{input}");
        print!("{}", render::frames(&frames));
    }
    Ok(())
}

async fn cmd_hits(config: &AppConfig, job_id: &str, target: &str) -> Result<()> {
    let job_id: JobId = job_id.parse()?;
    let rows = fetcher(config)?.hits_for_target(&job_id, target).await?;
    print!("{}", render::hits(target, &rows));
    Ok(())
}

fn cmd_highlight(
    config: &AppConfig,
    sequence: &str,
    orfs: &[String],
    copy: Option<usize>,
) -> Result<()> {
    let highlighted = highlight(sequence, orfs);
    let mut feedback = CopyFeedback::from(&config.highlight);

    let copied = match copy {
        Some(index) => {
            let text = index
                .checked_sub(1)
                .and_then(|i| highlighted.span_texts().nth(i))
                .ok_or_else(|| {
                    eyre!(
                        "no span {index}: {} span(s) found",
                        highlighted.spans().len()
                    )
                })?;
            feedback.copy(text, Instant::now());
            Some(text)
        }
        None => None,
    };
    let marked = copied.and_then(|_| feedback.current(Instant::now()));

    println!("{}", render::highlighted(&highlighted, marked));
    if highlighted.spans().is_empty() {
        println!("  (no ORF occurrences)");
    } else {
        print!("{}", render::span_list(&highlighted, marked));
    }
    if let Some(text) = copied {
        println!("{text}");
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(base_url: Option<&str>) -> Result<()> {
    let config = resolved_config(base_url)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_section<T>(section: SectionState<T>, show: impl FnOnce(&T) -> String) {
    match section {
        SectionState::Loaded(value) => print!("{}", show(&value)),
        SectionState::NoAlignment(detail) => println!("  No alignment: {detail}"),
        SectionState::Unavailable(reason) => println!("  Unavailable: {reason}"),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Polling progress as an indicatif spinner.
struct CliPoll {
    spinner: ProgressBar,
    job: String,
}

impl CliPoll {
    fn new(job_id: &JobId) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self {
            spinner,
            job: job_id.to_string(),
        }
    }
}

impl PollProgress for CliPoll {
    fn check_scheduled(&self, attempt: u32, delay: Duration) {
        self.spinner.set_message(format!(
            "Job {}: check #{attempt} in {:.1}s",
            self.job,
            delay.as_secs_f64()
        ));
    }

    fn status_observed(&self, attempt: u32, status: ReportedStatus) {
        let message = match status {
            ReportedStatus::Completed => format!("Job {}: completed, loading results", self.job),
            other => format!("Job {}: {other} after {attempt} check(s)", self.job),
        };
        self.spinner.set_message(message);
    }

    fn finished(&self, _outcome: &PollOutcome) {
        self.spinner.finish_and_clear();
    }
}
