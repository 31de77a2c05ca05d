use anyhow::{Context, Result};
use prompt_relay::Orchestrator;
use prompt_relay::cli::{Args, AskConfig, ChatConfig, ConfigDiscovery, ExecutionMode};
use prompt_relay::env;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(verbose(&mode));

    match mode {
        ExecutionMode::Ask(config) => run_ask(config).await,
        ExecutionMode::Chat(config) => run_chat(config).await,
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            let config = ConfigDiscovery::discover_config()
                .context("Failed to load configuration")?;
            println!();
            println!("Effective configuration:");
            println!("{}", config.to_toml_string()?);
            Ok(())
        }
        ExecutionMode::InitConfig(path) => {
            let written = ConfigDiscovery::create_default_config(path.as_deref())
                .context("Failed to write default configuration")?;
            println!("Configuration file: {}", written.display());
            Ok(())
        }
    }
}

fn verbose(mode: &ExecutionMode) -> bool {
    match mode {
        ExecutionMode::Ask(config) => config.verbose,
        ExecutionMode::Chat(config) => config.verbose,
        _ => false,
    }
}

/// Logs go to stderr so replies on stdout stay clean. `RUST_LOG` wins over the flag.
fn init_logging(verbose: bool) {
    let fallback = if verbose {
        env::VERBOSE_LOG_FILTER
    } else {
        env::DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_orchestrator(config_override: Option<&std::path::Path>) -> Result<Orchestrator> {
    let config = ConfigDiscovery::load(config_override).context("Failed to load configuration")?;
    let orchestrator =
        Orchestrator::from_config(&config).context("Failed to initialize orchestrator")?;
    info!(
        backends = orchestrator.backends().len(),
        "Starting prompt-relay"
    );
    Ok(orchestrator)
}

async fn run_ask(config: AskConfig) -> Result<()> {
    let orchestrator = build_orchestrator(config.config_override.as_deref())?;

    let result = orchestrator
        .dispatch(&config.conversation, &orchestrator.settings().user_label, &config.text)
        .await;

    if config.verbose {
        eprintln!("[{} in {} ms]", result.source, result.elapsed.as_millis());
    }
    println!("{}", result.text);

    orchestrator.shutdown();
    Ok(())
}

async fn run_chat(config: ChatConfig) -> Result<()> {
    let orchestrator = build_orchestrator(config.config_override.as_deref())?;
    let user_label = orchestrator.settings().user_label.clone();
    let bot_name = orchestrator.settings().bot_name.clone();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", user_label);
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let text = line.trim();
        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                orchestrator.reset_conversation(&config.conversation).await;
                println!("Context cleared.");
            }
            "/status" => print_status(&orchestrator)?,
            _ => {
                let result = orchestrator
                    .dispatch(&config.conversation, &user_label, text)
                    .await;
                if config.verbose {
                    eprintln!("[{} in {} ms]", result.source, result.elapsed.as_millis());
                }
                println!("{}: {}", bot_name, result.text);
            }
        }
    }

    orchestrator.shutdown();
    Ok(())
}

fn print_status(orchestrator: &Orchestrator) -> Result<()> {
    let status = orchestrator.status();
    if status.is_empty() {
        println!("No backends configured.");
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
