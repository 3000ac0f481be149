//! `inkwell-check`: run one check cycle over a file and print the result.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use inkwell_check::orchestrator::SharedText;
use inkwell_check::{Coverage, Engine, EnvCredentials, telemetry};
use inkwell_core::InkwellConfig;
use inkwell_core::analysis::writing_tips;
use inkwell_llm::prompt::PromptEngine;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "inkwell-check", version, about = "Check a text file for spelling and grammar")]
struct Args {
    /// File to check.
    file: PathBuf,
    /// TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory of TOML prompt templates.
    #[arg(long)]
    prompts: Option<PathBuf>,
    /// Also ask for next-sentence suggestions.
    #[arg(long)]
    suggest: bool,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => InkwellConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => InkwellConfig::default(),
    };
    telemetry::init(&config.general);

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let prompts = match &args.prompts {
        Some(dir) => PromptEngine::from_directory(dir)?,
        None => PromptEngine::builtin(),
    };

    let credentials = EnvCredentials::new(config.ai.api_key_env.clone());
    let engine = Engine::from_config(&config, &credentials, prompts)?;
    let (orchestrator, mut reports) = engine.orchestrator(&config, Arc::new(SharedText::new(text.clone())));
    orchestrator.set_journal(Engine::journal(&config).context("opening error journal")?);

    let request_id = orchestrator.check_now();
    info!(request_id, file = %args.file.display(), "checking");
    let report = reports
        .recv()
        .await
        .context("orchestrator stopped before reporting")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for error in &report.errors {
            let source = error.source_text(&report.snapshot).unwrap_or_default();
            let fix = if error.primary_fix.is_empty() {
                "(no fix known)"
            } else {
                error.primary_fix.as_str()
            };
            print!("{} {source:?} -> {fix:?} [{}]", error.span, error.category.label());
            if !error.alternative_fixes.is_empty() {
                print!(" also: {}", error.alternative_fixes.join(", "));
            }
            println!();
        }
        match &report.coverage {
            Coverage::Full => {}
            Coverage::Partial { missing, reason } => {
                eprintln!("note: {missing} checker unavailable ({reason})");
            }
            Coverage::Failed { reason } => eprintln!("note: checking failed ({reason})"),
        }
        println!("{} issue(s)", report.errors.len());
        for tip in writing_tips(&text) {
            println!("tip: {}", tip.message());
        }
    }

    if args.suggest {
        match engine.suggestions.suggest(&text, config.suggestion.max_candidates).await {
            Ok(candidates) => {
                for candidate in candidates {
                    println!("suggestion {}: {}", candidate.rank + 1, candidate.text);
                }
            }
            Err(e) => eprintln!("note: suggestions unavailable ({e})"),
        }
    }

    Ok(())
}
