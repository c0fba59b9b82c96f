mod provider;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use uuid::Uuid;

use hm_core::{Session, TurnOutcome};
use hm_store::Store;

#[derive(Parser)]
#[command(name = "hm", about = "Hyperloop mind cognition engine CLI")]
struct Cli {
    /// Session id override (defaults to the active session)
    #[arg(long, global = true)]
    session: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scored turn against the candidate provider
    Turn {
        /// The user message for this round
        message: String,

        /// Inject a candidate response instead of calling the provider
        /// (repeatable)
        #[arg(long = "candidate")]
        candidates: Vec<String>,

        /// Use the stochastic weighted-draw collapse policy
        #[arg(long)]
        stochastic: bool,

        /// RNG seed for the stochastic policy (reproducible draws)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show session statistics
    Stats,

    /// Print the folded coherence field as JSON
    Field,

    /// List known sessions
    Sessions,

    /// Export the session to a snapshot JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import a snapshot JSON file and make it the active session
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn data_dir() -> PathBuf {
    std::env::var("HM_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".hyperloop-mind")
        })
}

fn open_store() -> Result<Store> {
    let dir = data_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data dir {}", dir.display()))?;
    Store::open(&dir.join("mind.db")).context("failed to open store")
}

/// Resolve which session this invocation addresses: explicit `--session`,
/// then the recorded active session, then a fresh id.
fn resolve_session(store: &Store, arg: Option<&str>) -> Result<Uuid> {
    if let Some(s) = arg {
        return Uuid::parse_str(s).context("invalid --session id");
    }
    if let Ok(Some(s)) = store.get_metadata("active_session")
        && let Ok(id) = Uuid::parse_str(&s)
    {
        return Ok(id);
    }
    Ok(Uuid::new_v4())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Turn {
            message,
            candidates,
            stochastic,
            seed,
        } => cmd_turn(&cli, message, candidates, *stochastic, *seed).await,
        Commands::Stats => cmd_stats(&cli),
        Commands::Field => cmd_field(&cli),
        Commands::Sessions => cmd_sessions(),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(path),
    }
}

async fn cmd_turn(
    cli: &Cli,
    message: &str,
    injected: &[String],
    stochastic: bool,
    seed: Option<u64>,
) -> Result<()> {
    let store = open_store()?;
    let id = resolve_session(&store, cli.session.as_deref())?;
    let mut session = store.load_or_seed(id);

    let candidates: Vec<String> = if !injected.is_empty() {
        injected.to_vec()
    } else if let Some(cfg) = provider::load_provider_config(&data_dir()) {
        match provider::fetch_candidates(&cfg, &session, message).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!("candidate source failed, degrading to fallback: {e}");
                vec![Session::fallback_response(&session.peek_round(message))]
            }
        }
    } else {
        tracing::debug!("no provider configured; using deterministic fallback");
        vec![Session::fallback_response(&session.peek_round(message))]
    };

    let outcome = if stochastic {
        let mut rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        };
        session.advance_with_rng(message, &candidates, &mut rng)
    } else {
        session.advance(message, &candidates)
    };

    // Persistence is best-effort: the turn result stands even if the write fails.
    if let Err(e) = store.record_turn(&session) {
        tracing::warn!("failed to persist turn: {e}");
    }
    if let Err(e) = store.set_metadata("active_session", &id.to_string()) {
        tracing::warn!("failed to record active session: {e}");
    }

    print_outcome(&outcome);
    if cli.verbose {
        eprintln!(
            "--- collapse: candidates={}, decoherence={}, time={:.3}ms ---",
            outcome.collapse.superposition.len(),
            outcome.collapse.decoherence_events,
            outcome.collapse.collapse_time_ms,
        );
        eprintln!(
            "--- field: peak={:.3}, wave_phase={:.6} ---",
            outcome.field.peak(),
            outcome.wave_phase,
        );
    }
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("{}", outcome.response);
    println!();
    println!(
        "round:   {}{}",
        outcome.record.round,
        if outcome.record.fire { "  FIRE" } else { "" }
    );
    println!("poly_c:  {:.4}", outcome.record.poly_c);
    println!("V:       {:.6}", outcome.record.v);
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let store = open_store()?;
    let id = resolve_session(&store, cli.session.as_deref())?;
    let session = store.load_or_seed(id);

    println!("session:     {id}");
    println!("rounds:      {}", session.total_rounds());
    println!("V:           {:.6}", session.v());
    println!("fires:       {}", session.fire_count());
    println!("spine:       {}", session.spine().len());
    println!("wave_phase:  {:.6}", session.wave_phase());
    Ok(())
}

fn cmd_field(cli: &Cli) -> Result<()> {
    let store = open_store()?;
    let id = resolve_session(&store, cli.session.as_deref())?;
    let session = store.load_or_seed(id);

    let field = session.fold_field();
    println!(
        "{}",
        serde_json::to_string(&field.cells).context("failed to serialize field")?
    );
    Ok(())
}

fn cmd_sessions() -> Result<()> {
    let store = open_store()?;
    let ids = store.session_ids().context("failed to list sessions")?;
    if ids.is_empty() {
        println!("(no sessions)");
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn cmd_export(cli: &Cli, path: &std::path::Path) -> Result<()> {
    let store = open_store()?;
    let id = resolve_session(&store, cli.session.as_deref())?;
    store
        .export_json_file(id, path)
        .context("failed to export session")?;
    println!("exported {id} to {}", path.display());
    Ok(())
}

fn cmd_import(path: &std::path::Path) -> Result<()> {
    let store = open_store()?;
    let id = store
        .import_json_file(path)
        .context("failed to import snapshot")?;
    store
        .set_metadata("active_session", &id.to_string())
        .context("failed to record active session")?;
    println!("imported session {id}");
    Ok(())
}
