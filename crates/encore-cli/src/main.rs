use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use encore_core::capture::{CaptureSession, StartOutcome, StopOutcome};
use encore_core::config::EncoreConfig;
use encore_core::corpus::ExampleCorpus;
use encore_core::embedding::EmbeddingService;
use encore_core::llm::LlmService;
use encore_core::model::{CapturedEvent, ExampleRecord};
use encore_core::runner::{CodeRunner, RunOutcome};
use encore_core::synth::ScriptSynthesizer;
use owo_colors::OwoColorize;

#[derive(Parser)]
#[command(name = "encore", about = "Encore: capture desktop flows and synthesize automation scripts", version)]
enum Cli {
    /// Write a starter config (./encore.toml)
    Init {
        /// Embedding provider to configure (hash, openai)
        #[arg(long, default_value = "hash")]
        provider: String,
    },
    /// Record a capture session (stops on Enter)
    Capture {
        /// Write the synthesized replay script to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Synthesize an AppleScript replay from the captured events
        #[arg(long)]
        replay: bool,
    },
    /// Generate a script for a request using few-shot retrieval
    Generate {
        /// What the script should do
        prompt: String,
        /// Execute the generated script and record the outcome
        #[arg(long)]
        run: bool,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Execute an existing script file
    Run {
        /// Script path
        path: PathBuf,
    },
    /// Record explicit feedback on a script
    Feedback {
        /// The request the script was meant to satisfy
        prompt: String,
        /// Path of the script file
        #[arg(long)]
        code_file: PathBuf,
        /// The script worked
        #[arg(long, conflicts_with = "bad")]
        good: bool,
        /// The script did not work
        #[arg(long)]
        bad: bool,
    },
    /// Show corpus and configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = EncoreConfig::load(Some(&std::env::current_dir()?)).unwrap_or_default();
    for warning in config.validate() {
        eprintln!("{} {}", "warning:".yellow(), warning);
    }

    match cli {
        Cli::Init { provider } => cmd_init(&provider),
        Cli::Capture { output, replay } => cmd_capture(&config, output, replay).await,
        Cli::Generate { prompt, run, json } => cmd_generate(&config, &prompt, run, json).await,
        Cli::Run { path } => cmd_run(&config, &path).await,
        Cli::Feedback {
            prompt,
            code_file,
            good,
            bad,
        } => cmd_feedback(&config, &prompt, &code_file, good, bad).await,
        Cli::Status => cmd_status(&config),
    }
}

fn cmd_init(provider: &str) -> Result<()> {
    if !encore_core::config::VALID_EMBEDDING_PROVIDERS.contains(&provider) {
        anyhow::bail!(
            "unknown provider '{}'. Valid options: {}",
            provider,
            encore_core::config::VALID_EMBEDDING_PROVIDERS.join(", ")
        );
    }

    let path = std::env::current_dir()?.join("encore.toml");
    if path.exists() {
        println!("Encore already initialized here ({}).", path.display());
        return Ok(());
    }

    let mut config = EncoreConfig::default();
    config.embedding.provider = provider.to_string();
    let note = match provider {
        "openai" => "# Set OPENAI_API_KEY env var\n",
        _ => "# Deterministic hashing, no semantic retrieval (for testing)\n",
    };
    std::fs::write(&path, format!("{}{}", note, toml::to_string_pretty(&config)?))?;

    println!("{}", "Initialized Encore.".green());
    println!("  {}    encore.toml", "Config:".dimmed());
    println!("  {}  {}", "Provider:".dimmed(), provider.cyan());
    println!();
    println!("{}", "Quick Start:".bold());
    println!("  1. Record a flow:      {}", "encore capture --replay".cyan());
    println!("  2. Generate a script:  {}", "encore generate \"open safari\" --run".cyan());
    println!("  3. Give feedback:      {}", "encore feedback ... --good".cyan());
    Ok(())
}

async fn cmd_capture(config: &EncoreConfig, output: Option<PathBuf>, replay: bool) -> Result<()> {
    let mut session = CaptureSession::new(config.capture.clone(), config.session_dir());

    match session.start()? {
        StartOutcome::Started { pid, .. } => {
            println!(
                "{} (worker pid {})",
                "Recording clicks and keys…".green(),
                pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into())
            );
        }
        StartOutcome::AlreadyCapturing => {
            println!("Already capturing.");
            return Ok(());
        }
    }
    println!("{}", "Press Enter to stop.".dimmed());

    // Blocking read on its own thread so the runtime stays free.
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
    })
    .await?;

    let (events, clean_exit) = match session.stop().await? {
        StopOutcome::Stopped {
            events, clean_exit, ..
        } => (events, clean_exit),
        StopOutcome::NotCapturing => {
            println!("Not capturing.");
            return Ok(());
        }
    };

    if !clean_exit {
        eprintln!("{}", "warning: capture worker did not exit cleanly".yellow());
    }
    print_event_summary(&events);

    if replay {
        if events.is_empty() {
            anyhow::bail!("nothing captured, no replay script to synthesize");
        }
        println!("{}", "Synthesizing replay script…".dimmed());
        let synth = make_synthesizer(config)?;
        let code = synth.replay_script(&events).await?;
        match output {
            Some(path) => {
                std::fs::write(&path, &code)?;
                println!("{} {}", "Replay script written to".green(), path.display());
            }
            None => println!("{code}"),
        }
    }
    Ok(())
}

async fn cmd_generate(config: &EncoreConfig, prompt: &str, run: bool, json: bool) -> Result<()> {
    let synth = make_synthesizer(config)?;
    let embedder = EmbeddingService::from_config(&config.embedding)
        .context("failed to create embedding service")?;
    let mut corpus = ExampleCorpus::load(config.corpus_path())?;

    let code = synth.generate(prompt, &mut corpus).await?;

    let mut outcome: Option<RunOutcome> = None;
    if run {
        let runner = CodeRunner::from_config(&config.runner);
        let result = runner.run(&code).await?;
        append_outcome(&mut corpus, &embedder, prompt, &code, result.success).await?;
        outcome = Some(result);
    }

    if json {
        let mut value = serde_json::json!({ "prompt": prompt, "code": code });
        if let Some(ref o) = outcome {
            value["success"] = serde_json::json!(o.success);
            value["exit_code"] = serde_json::json!(o.exit_code);
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{code}");
    if let Some(o) = outcome {
        println!();
        if o.success {
            println!("{}", "✓ Success (recorded as a good example)".green());
        } else {
            println!("{}", "✗ Failed (recorded as a pattern to avoid)".red());
            if !o.stderr.is_empty() {
                println!("{}", o.stderr.dimmed());
            }
        }
    }
    Ok(())
}

async fn cmd_run(config: &EncoreConfig, path: &std::path::Path) -> Result<()> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let runner = CodeRunner::from_config(&config.runner);
    let outcome = runner.run(&code).await?;

    if outcome.success {
        println!("{}", "✓ Success".green());
    } else {
        println!("{}", "✗ Failed".red());
        if !outcome.stderr.is_empty() {
            println!("{}", outcome.stderr.dimmed());
        }
        std::process::exit(outcome.exit_code.unwrap_or(1));
    }
    Ok(())
}

async fn cmd_feedback(
    config: &EncoreConfig,
    prompt: &str,
    code_file: &std::path::Path,
    good: bool,
    bad: bool,
) -> Result<()> {
    if good == bad {
        anyhow::bail!("pass exactly one of --good or --bad");
    }
    let code = std::fs::read_to_string(code_file)
        .with_context(|| format!("failed to read script {}", code_file.display()))?;

    let embedder = EmbeddingService::from_config(&config.embedding)
        .context("failed to create embedding service")?;
    let mut corpus = ExampleCorpus::load(config.corpus_path())?;
    append_outcome(&mut corpus, &embedder, prompt, &code, good).await?;

    if good {
        println!("{}", "Saved as a good example.".green());
    } else {
        println!("{}", "Saved as a pattern to avoid.".yellow());
    }
    Ok(())
}

fn cmd_status(config: &EncoreConfig) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("Encore Status v{version}").bold());

    match ExampleCorpus::load(config.corpus_path()) {
        Ok(corpus) => {
            println!(
                "  {}     {} ({} good, {} to avoid)",
                "Corpus:".dimmed(),
                config.corpus_path().display(),
                corpus.successes().len().to_string().green(),
                corpus.failures().len().to_string().red(),
            );
        }
        Err(e) => println!("  {}     {}", "Corpus:".dimmed(), format!("unreadable: {e}").red()),
    }

    match EmbeddingService::from_config(&config.embedding) {
        Ok(service) => println!(
            "  {}  {} / {} ({}d)",
            "Embedding:".dimmed(),
            service.provider_name().cyan(),
            service.model_id(),
            service.dimensions()
        ),
        Err(e) => println!(
            "  {}  {} ({})",
            "Embedding:".dimmed(),
            config.embedding.provider,
            format!("NOT CONFIGURED: {e}").red()
        ),
    }

    match LlmService::from_config(&config.llm) {
        Ok(service) => println!(
            "  {}        {} / {}",
            "LLM:".dimmed(),
            config.llm.provider.cyan(),
            service.model()
        ),
        Err(e) => println!(
            "  {}        {} ({})",
            "LLM:".dimmed(),
            config.llm.provider,
            format!("NOT CONFIGURED: {e}").red()
        ),
    }

    println!(
        "  {}     {} ({}s timeout)",
        "Runner:".dimmed(),
        config.runner.interpreter.cyan(),
        config.runner.timeout_secs
    );
    println!("  {}   {}", "Sessions:".dimmed(), config.session_dir().display());
    Ok(())
}

fn make_synthesizer(config: &EncoreConfig) -> Result<ScriptSynthesizer> {
    let llm = LlmService::from_config(&config.llm).context("failed to create LLM service")?;
    let embedder = EmbeddingService::from_config(&config.embedding)
        .context("failed to create embedding service")?;
    Ok(ScriptSynthesizer::new(llm, embedder))
}

/// Embed the prompt up front so the corpus record travels with its vector,
/// then append. An embedding failure degrades to an unembedded record (it
/// gets backfilled on the next load) rather than losing the outcome.
async fn append_outcome(
    corpus: &mut ExampleCorpus,
    embedder: &EmbeddingService,
    prompt: &str,
    code: &str,
    success: bool,
) -> Result<()> {
    let mut record = ExampleRecord::new(prompt, code, success);
    match embedder.embed(prompt).await {
        Ok(vector) => record.embedding = Some(vector),
        Err(e) => tracing::warn!("failed to embed feedback prompt: {e}"),
    }
    corpus.append(record)?;
    Ok(())
}

fn print_event_summary(events: &[CapturedEvent]) {
    println!(
        "{} {} {}",
        "Captured".bold(),
        events.len().to_string().cyan(),
        if events.len() == 1 { "event" } else { "events" }
    );
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for event in events {
        *counts.entry(event.kind.label()).or_default() += 1;
    }
    for (label, count) in counts {
        println!("  {} {}", format!("{label}:").dimmed(), count);
    }
}
