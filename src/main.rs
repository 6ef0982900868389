use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use transgate::config::{Config, EngineKind};
use transgate::interactive::run_shell;
use transgate::schema::{BatchTranslationRequest, RequestError, TranslationRequest};
use transgate::{ProviderRegistry, TranslateError, TranslationService};

#[derive(Parser)]
#[command(name = "transgate")]
#[command(version, about = "Route translations to Google, OpenAI or a local model")]
#[command(
    long_about = "Translate text through one of several interchangeable engines: Google Cloud Translation, an OpenAI chat model, or a locally hosted seq2seq model."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Translation engine: google, openai, local (overrides config)
    #[arg(short, long, global = true)]
    engine: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a single text
    Translate {
        text: String,

        /// Source language code (e.g., en, ja, es)
        #[arg(short, long, default_value = "en")]
        from: String,

        /// Target language code
        #[arg(short, long)]
        to: String,
    },

    /// Translate several texts; reads one text per line from stdin when none are given
    Batch {
        texts: Vec<String>,

        #[arg(short, long, default_value = "en")]
        from: String,

        #[arg(short, long)]
        to: String,
    },

    /// List languages supported by the engine
    Languages,

    /// Probe the engine
    Health,

    /// Show which engines are configured
    Engines,

    /// Interactive shell with live engine switching
    Shell {
        #[arg(short, long, default_value = "en")]
        from: String,

        #[arg(short, long, default_value = "es")]
        to: String,
    },
}

fn init_logging(verbose: bool, configured: Option<&str>) {
    let level = if verbose {
        Level::DEBUG
    } else {
        configured
            .and_then(|l| l.parse().ok())
            .unwrap_or(Level::INFO)
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_stdin_lines() -> Result<Vec<String>> {
    let mut texts = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if !line.trim().is_empty() {
            texts.push(line);
        }
    }
    Ok(texts)
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: String,
    message: String,
    status: u16,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Raised by `health` after the report has been printed.
#[derive(Debug, thiserror::Error)]
#[error("Translation engine is unavailable")]
struct UnhealthyEngine;

fn classify(err: &anyhow::Error) -> (&'static str, u16) {
    if let Some(e) = err.downcast_ref::<TranslateError>() {
        (e.kind(), e.status_code())
    } else if err.downcast_ref::<UnhealthyEngine>().is_some() {
        ("EngineUnavailable", 503)
    } else if let Some(e) = err.downcast_ref::<RequestError>() {
        ("InvalidRequest", e.status_code())
    } else {
        ("InternalError", 500)
    }
}

/// Text to print for a failed command, if any.
fn render_error(err: &anyhow::Error, json: bool) -> Option<String> {
    let (kind, status) = classify(err);

    if !json {
        return Some(format!(
            "{} {} ({}): {:#}",
            style("error").red().bold(),
            kind,
            status,
            err
        ));
    }

    // stdout already holds the health report as the single JSON document
    if err.downcast_ref::<UnhealthyEngine>().is_some() {
        return None;
    }

    let envelope = ErrorEnvelope {
        error: kind.to_string(),
        message: format!("{:#}", err),
        status,
        timestamp: chrono::Utc::now(),
    };
    serde_json::to_string_pretty(&envelope).ok()
}

fn report_error(err: &anyhow::Error, json: bool) {
    match render_error(err, json) {
        Some(text) if json => println!("{}", text),
        Some(text) => eprintln!("{}", text),
        None => {}
    }
}

async fn run(cli: Cli, config: Config, service: &TranslationService) -> Result<()> {
    let show_progress = !cli.no_progress && !cli.json;

    match cli.command {
        Command::Translate { text, from, to } => {
            let request = TranslationRequest::new(text, from, to);
            request.validate(&config.limits)?;

            let pb = spinner(show_progress, "Translating");
            let result = service.translate(&request).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            let result = result?;

            if cli.json {
                print_json(&result)?;
            } else {
                println!("{}", result.translated_text);
            }
        }
        Command::Batch { texts, from, to } => {
            let texts = if texts.is_empty() {
                read_stdin_lines()?
            } else {
                texts
            };
            let request = BatchTranslationRequest::new(texts, from, to);
            request.validate(&config.limits)?;

            let pb = spinner(
                show_progress,
                &format!("Translating {} texts", request.texts.len()),
            );
            let result = service.batch_translate(&request).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            let result = result?;

            if cli.json {
                print_json(&result)?;
            } else {
                for text in &result.translated_texts {
                    println!("{}", text);
                }
            }
        }
        Command::Languages => {
            let result = service.supported_languages().await?;
            if cli.json {
                print_json(&result)?;
            } else {
                for (code, name) in &result.languages {
                    println!("{}\t{}", code, name);
                }
                info!("{} languages via {}", result.total, result.engine);
            }
        }
        Command::Health => {
            let pb = spinner(show_progress, "Probing engine");
            let report = service.health_check().await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            if cli.json {
                print_json(&report)?;
            } else if report.healthy {
                println!(
                    "{} {} ({:.2} ms)",
                    style("healthy").green(),
                    report.engine,
                    report.response_time_ms
                );
            } else {
                println!(
                    "{} {}{}",
                    style("unhealthy").red(),
                    report.engine,
                    report
                        .error
                        .as_deref()
                        .map(|e| format!(": {}", e))
                        .unwrap_or_default()
                );
            }
            if !report.healthy {
                return Err(UnhealthyEngine.into());
            }
        }
        Command::Engines => {
            let status = service.registry().engine_status().await;
            if cli.json {
                print_json(&status)?;
            } else {
                println!("Current engine: {}", style(status.current_engine).cyan());
                for kind in EngineKind::ALL {
                    let mark = if status.available_engines.contains(&kind) {
                        style("✓").green()
                    } else {
                        style("✗").red()
                    };
                    println!("  {} {}", mark, kind);
                }
                println!("Local model:    {} on {}", status.local_model, status.local_device);
            }
        }
        Command::Shell { from, to } => {
            run_shell(service, from, to).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    init_logging(cli.verbose, config.log_level.as_deref());

    if let Some(ref engine) = cli.engine {
        config.engine = engine
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
    }

    if !matches!(cli.command, Command::Engines | Command::Health) {
        config
            .validate(config.engine)
            .context("Configuration validation failed")?;
    }

    info!("Translation engine: {}", config.engine);

    let json = cli.json;
    let registry = Arc::new(ProviderRegistry::new(config.clone()));
    let service = TranslationService::new(registry.clone());

    let outcome = run(cli, config, &service).await;
    registry.shutdown().await;

    if let Err(ref err) = outcome {
        report_error(err, json);
        std::process::exit(1);
    }

    Ok(())
}
