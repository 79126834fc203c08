mod display;
mod watch;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use legality_core::{
    FeedbackId, FeedbackStatus, FeedbackSubmission, FeedbackType, TriagePolicy, VisibilityWindow,
};
use legality_host::{AdminGate, Confirmation, FeedbackDesk, ProvidedKey};
use legality_store::{ClientConfig, CredentialStore, default_config_dir};
use legality_sync::{AnalysisApi, ApiClient};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "legality", version, about = "Legality AI contract analysis client")]
struct Cli {
    /// API base URL (overrides config.toml)
    #[arg(long, global = true, env = "LEGALITY_API_URL")]
    api_url: Option<String>,

    /// Directory holding config.toml and credentials.toml
    #[arg(long, global = true, env = "LEGALITY_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Admin key for this invocation only (not stored)
    #[arg(long, global = true, env = "LEGALITY_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API answers
    Health,
    /// Poll an analysis job until it finishes and print its results
    Watch {
        job_id: String,
        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Submit feedback on one clause of a finished analysis
    Feedback {
        job_id: String,
        chunk_id: String,
        #[arg(long, value_enum)]
        kind: FeedbackKind,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Store an admin key for later admin commands
    Login {
        /// Read from stdin when omitted
        key: Option<String>,
    },
    /// Forget the stored admin key
    Logout,
    /// Show the feedback review queues
    Queue {
        #[command(flatten)]
        view: ViewArgs,
        /// Print full cards instead of one line per record
        #[arg(long)]
        full: bool,
    },
    /// Approve, reject, or reset one feedback record
    Review {
        id: String,
        #[arg(value_enum)]
        action: ReviewAction,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Push one feedback record into the knowledge store
    Sync { id: String },
    /// Push every approved record into the knowledge store
    Commit {
        /// Confirmation key; prompted for when omitted
        #[arg(long)]
        confirm_key: Option<String>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Download all feedback as CSV
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Hide pending fix reviews older than this many days
    #[arg(long)]
    window_days: Option<u32>,
    /// Maximum records to load
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedbackKind {
    /// Flagged clause is not actually risky
    NotRisky,
    /// Suggested fix is good
    GoodFix,
    /// Suggested fix is bad
    BadFix,
    /// A risk the analysis missed
    Missed,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReviewAction {
    Approve,
    Reject,
    Reset,
}

impl ReviewAction {
    fn status(self) -> FeedbackStatus {
        match self {
            Self::Approve => FeedbackStatus::Approved,
            Self::Reject => FeedbackStatus::Rejected,
            Self::Reset => FeedbackStatus::Pending,
        }
    }
}

/// Asks for the admin key again on stdin.
struct StdinPrompt;

impl Confirmation for StdinPrompt {
    fn confirm_admin_key(&self, approved: usize) -> Option<String> {
        prompt_line(&format!(
            "Commit {approved} approved item(s) to the knowledge store. Re-enter admin key: "
        ))
    }
}

fn prompt_line(prompt: &str) -> Option<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

struct Session {
    config: ClientConfig,
    config_dir: PathBuf,
    api: ApiClient,
    admin_key: Option<String>,
}

impl Session {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);
        let mut config = ClientConfig::load_from(&config_dir)
            .with_context(|| format!("loading config from {}", config_dir.display()))?;
        if let Some(url) = &cli.api_url {
            config.api_url = url.clone();
        }
        let api = ApiClient::with_timeout(config.api_url.clone(), config.request_timeout())
            .context("building HTTP client")?;
        Ok(Self {
            config,
            config_dir,
            api,
            admin_key: cli.admin_key.clone(),
        })
    }

    fn gate(&self) -> AdminGate {
        AdminGate::new(CredentialStore::in_dir(&self.config_dir))
    }

    fn policy(&self, view: &ViewArgs) -> TriagePolicy {
        let window = view
            .window_days
            .map(VisibilityWindow::days)
            .unwrap_or_else(|| self.config.visibility_window());
        TriagePolicy::with_window(window)
    }

    /// Open an admin session and load the feedback collection.
    async fn desk(&self, view: &ViewArgs) -> anyhow::Result<FeedbackDesk<ApiClient>> {
        let session = self
            .gate()
            .open(self.admin_key.as_deref())
            .context("opening admin session")?;
        let mut desk = FeedbackDesk::new(self.api.clone(), session)
            .with_policy(self.policy(view))
            .with_limit(view.limit.unwrap_or(self.config.feedback_limit));
        desk.load().await.context("loading feedback")?;
        Ok(desk)
    }

    /// Admin session without loading anything.
    fn bare_desk(&self) -> anyhow::Result<FeedbackDesk<ApiClient>> {
        let session = self
            .gate()
            .open(self.admin_key.as_deref())
            .context("opening admin session")?;
        Ok(FeedbackDesk::new(self.api.clone(), session))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let session = Session::open(&cli)?;
    tracing::debug!(api_url = %session.api.base_url(), "legality v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Health => {
            if session.api.health().await {
                println!("{} is up", session.api.base_url());
            } else {
                anyhow::bail!("{} is not reachable", session.api.base_url());
            }
        }

        Commands::Watch {
            ref job_id,
            interval_ms,
        } => {
            let period = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| session.config.poll_interval());
            let outcome = watch::run_watch(Arc::new(session.api.clone()), job_id, period).await?;
            if let Some(results) = outcome.results {
                eprintln!("  Finished in {:.1}s", outcome.elapsed_secs);
                display::print_results(&results).context("writing results")?;
            }
        }

        Commands::Feedback {
            ref job_id,
            ref chunk_id,
            kind,
            ref comment,
        } => {
            let results = session
                .api
                .job_results(job_id)
                .await
                .with_context(|| format!("fetching results for {job_id}"))?;
            let clause = results
                .clause(chunk_id)
                .with_context(|| format!("no risky clause {chunk_id} in {job_id}"))?;

            let mut submission = FeedbackSubmission::for_clause(clause, Some(job_id.as_str()));
            let feedback_type = match kind {
                FeedbackKind::NotRisky => FeedbackType::FalsePositive,
                FeedbackKind::Missed => FeedbackType::FalseNegative,
                FeedbackKind::GoodFix => {
                    submission = submission.with_verdict(true);
                    FeedbackType::ApproveFix
                }
                FeedbackKind::BadFix => {
                    submission = submission.with_verdict(false);
                    FeedbackType::ApproveFix
                }
            };
            if let Some(comment) = comment {
                submission = submission.with_comment(comment.clone());
            }

            let receipt = session
                .api
                .submit_feedback(feedback_type, &submission)
                .await
                .context("submitting feedback")?;
            println!("{} (feedback #{})", receipt.message, receipt.feedback_id);
        }

        Commands::Login { ref key } => {
            let key = match key.clone().or_else(|| session.admin_key.clone()) {
                Some(key) => key,
                None => prompt_line("Admin key: ").unwrap_or_default(),
            };
            session.gate().login(&key).context("storing admin key")?;
            println!("Admin key stored in {}", session.config_dir.display());
        }

        Commands::Logout => {
            if session.gate().logout()? {
                println!("Admin key removed");
            } else {
                println!("No admin key was stored");
            }
        }

        Commands::Queue { ref view, full } => {
            let desk = session.desk(view).await?;
            let now = Utc::now();
            let buckets = desk.buckets(now);
            if full {
                for record in buckets
                    .false_positive_review
                    .iter()
                    .chain(&buckets.fix_review)
                    .chain(&buckets.approved)
                {
                    display::print_feedback_card(record);
                }
            } else {
                display::print_buckets(&buckets, desk.policy().fix_review_window, now);
            }
        }

        Commands::Review {
            ref id,
            action,
            ref view,
        } => {
            let mut desk = session.desk(view).await?;
            let id = FeedbackId::from(id.as_str());
            desk.update_status(&id, action.status())
                .await
                .with_context(|| format!("updating feedback {id}"))?;
            println!("Feedback #{id} is now {}", action.status());
        }

        Commands::Sync { ref id } => {
            let desk = session.bare_desk()?;
            let id = FeedbackId::from(id.as_str());
            let ack = desk
                .sync_one(&id)
                .await
                .with_context(|| format!("syncing feedback {id}"))?;
            println!(
                "{}",
                ack.message
                    .unwrap_or_else(|| format!("Feedback #{id} synced"))
            );
        }

        Commands::Commit {
            ref confirm_key,
            ref view,
        } => {
            let mut desk = session.desk(view).await?;
            let report = match confirm_key {
                Some(key) => {
                    desk.commit_approved(&ProvidedKey(Some(key.clone())))
                        .await?
                }
                None => desk.commit_approved(&StdinPrompt).await?,
            };
            println!(
                "Synced {} item(s) ({} approved at commit time); {} record(s) reloaded",
                report.synced, report.approved_at_call, report.reloaded
            );
        }

        Commands::Export { ref out } => {
            let desk = session.bare_desk()?;
            let csv = desk.export_csv().await.context("exporting feedback")?;
            match out {
                Some(path) => {
                    std::fs::write(path, &csv)
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!("  Wrote {} bytes to {}", csv.len(), path.display());
                }
                None => print!("{csv}"),
            }
        }
    }

    Ok(())
}
