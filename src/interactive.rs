use crate::config::EngineKind;
use crate::languages::is_two_letter_code;
use crate::schema::TranslationRequest;
use crate::service::TranslationService;
use console::style;
use dialoguer::{FuzzySelect, Input};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One parsed line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Translate(String),
    /// `None` asks the user to pick from a list.
    Engine(Option<EngineKind>),
    From(String),
    To(String),
    Swap,
    Languages,
    Health,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> ShellCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(':') else {
        return ShellCommand::Translate(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (command, arg) {
        ("engine", None) => ShellCommand::Engine(None),
        ("engine", Some(kind)) => match kind.parse() {
            Ok(kind) => ShellCommand::Engine(Some(kind)),
            Err(e) => ShellCommand::Invalid(e),
        },
        ("from", Some(code)) if is_two_letter_code(code) => ShellCommand::From(code.to_lowercase()),
        ("to", Some(code)) if is_two_letter_code(code) => ShellCommand::To(code.to_lowercase()),
        ("from", _) | ("to", _) => {
            ShellCommand::Invalid("Expected a two-letter language code".to_string())
        }
        ("swap", None) => ShellCommand::Swap,
        ("languages", None) => ShellCommand::Languages,
        ("health", None) => ShellCommand::Health,
        ("help", None) => ShellCommand::Help,
        ("quit", None) | ("q", None) | ("exit", None) => ShellCommand::Quit,
        _ => ShellCommand::Invalid(format!("Unknown command: {}", line)),
    }
}

/// Interactive translation loop with live engine switching.
///
/// Returns when the user quits or presses Ctrl+C. The caller is responsible
/// for shutting down the registry afterwards.
pub async fn run_shell(service: &TranslationService, from: String, to: String) -> anyhow::Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))?;
    }

    print_header();

    let mut source = from;
    let mut target = to;

    while !interrupted.load(Ordering::SeqCst) {
        let engine = service.registry().engine().await;
        let prompt = format!("[{} {}->{}]", engine, source, target);

        let line = match tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await?
        {
            Ok(line) => line,
            // Ctrl+C or closed stdin
            Err(_) => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            ShellCommand::Translate(text) => {
                let request = TranslationRequest::new(text, source.clone(), target.clone());
                match service.translate(&request).await {
                    Ok(result) => println!("{}", style(result.translated_text).green()),
                    Err(e) => print_error(&e.to_string()),
                }
            }
            ShellCommand::Engine(kind) => {
                let kind = match kind {
                    Some(kind) => kind,
                    None => match select_engine(engine).await? {
                        Some(kind) => kind,
                        None => continue,
                    },
                };
                match service.registry().switch_engine(kind).await {
                    Ok(provider) => println!(
                        "{} Switched to {}",
                        style("✓").green(),
                        style(provider.name()).cyan()
                    ),
                    Err(e) => print_error(&e.to_string()),
                }
            }
            ShellCommand::From(code) => source = code,
            ShellCommand::To(code) => target = code,
            ShellCommand::Swap => std::mem::swap(&mut source, &mut target),
            ShellCommand::Languages => match service.supported_languages().await {
                Ok(result) => {
                    for (code, name) in &result.languages {
                        println!("  {}  {}", style(code).cyan(), name);
                    }
                    println!("{} languages via {}", result.total, result.engine);
                }
                Err(e) => print_error(&e.to_string()),
            },
            ShellCommand::Health => {
                let report = service.health_check().await;
                if report.healthy {
                    println!(
                        "{} {} ({:.2} ms)",
                        style("healthy").green(),
                        report.engine,
                        report.response_time_ms
                    );
                } else {
                    println!("{} {}", style("unhealthy").red(), report.engine);
                }
            }
            ShellCommand::Help => print_help(),
            ShellCommand::Quit => break,
            ShellCommand::Invalid(message) => print_error(&message),
        }
    }

    println!();
    Ok(())
}

async fn select_engine(current: EngineKind) -> anyhow::Result<Option<EngineKind>> {
    let default = EngineKind::ALL
        .iter()
        .position(|k| *k == current)
        .unwrap_or(0);

    let selection = tokio::task::spawn_blocking(move || {
        let items: Vec<String> = EngineKind::ALL.iter().map(|k| k.to_string()).collect();
        FuzzySelect::new()
            .with_prompt("Select translation engine")
            .items(&items)
            .default(default)
            .interact_opt()
    })
    .await??;

    Ok(selection.map(|i| EngineKind::ALL[i]))
}

fn print_header() {
    println!();
    println!("{}", style("transgate interactive shell").cyan().bold());
    println!("{}", style("Type text to translate, :help for commands.").dim());
    println!();
}

fn print_help() {
    println!("  {}   switch engine (google, openai, local)", style(":engine [kind]").cyan());
    println!("  {}      set source language", style(":from <code>").cyan());
    println!("  {}        set target language", style(":to <code>").cyan());
    println!("  {}             swap source and target", style(":swap").cyan());
    println!("  {}        list supported languages", style(":languages").cyan());
    println!("  {}           probe the active engine", style(":health").cyan());
    println!("  {}             leave the shell", style(":quit").cyan());
}

fn print_error(message: &str) {
    println!("{} {}", style("!").red(), message);
}
