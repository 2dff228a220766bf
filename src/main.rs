//! cmdjail - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use cmdjail::{
    cli::{Args, Commands, Config, Verbosity},
    server,
    telemetry::{TelemetryCollector, TelemetryDisplay},
    tools::{Gateway, ToolDispatcher, ToolResponse},
};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if !config.telemetry.color_output {
        colored::control::set_override(false);
    }

    let default_verbosity =
        Verbosity::parse(&config.telemetry.default_verbosity).unwrap_or(Verbosity::Normal);
    let verbosity = args.verbosity(default_verbosity);

    if let Commands::Config { save } = args.command {
        if save {
            return save_config(&config, args.config.clone());
        }
        return show_config(&config);
    }

    let telemetry = TelemetryCollector::new().with_echo(verbosity.show_events());
    let gateway = Gateway::new(config.allowed_dir()?, config.to_policy(), telemetry.clone())
        .context("Failed to initialize gateway")?;
    let dispatcher = ToolDispatcher::new(Arc::new(gateway), config.sandbox.max_parallel);
    let display = TelemetryDisplay::new(telemetry, verbosity);

    let exit_code = match &args.command {
        Commands::Run { command } => run_once(&dispatcher, command).await,
        Commands::Rules => {
            print!("{}", dispatcher.gateway().security_rules());
            0
        }
        Commands::Tools => {
            let tools = serde_json::to_string_pretty(&dispatcher.list_tools())?;
            println!("{}", tools);
            0
        }
        Commands::Serve => {
            if verbosity.show_status() {
                eprintln!(
                    "{} serving tool calls on stdio (root: {})",
                    "cmdjail".bold(),
                    dispatcher.gateway().root().display()
                );
            }
            server::serve_stdio(&dispatcher)
                .await
                .context("Tool server failed")?;
            0
        }
        Commands::Config { .. } => 0,
    };

    display.display_summary();

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Defaults, then config file, then environment, then flags
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    config
        .apply_env()
        .context("Invalid environment configuration")?;

    if let Some(dir) = &args.allowed_dir {
        config.sandbox.allowed_dir = Some(dir.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Execute one command and print its segments; returns the process exit code
async fn run_once(dispatcher: &ToolDispatcher, command: &str) -> i32 {
    let gateway = dispatcher.gateway();

    let (response, exit_code) = match gateway.execute(command).await {
        Ok(result) => (ToolResponse::from_execution(&result), result.exit_code),
        Err(e) => {
            let code = if e.is_security() { 2 } else { 1 };
            (ToolResponse::failure(Gateway::describe_failure(&e)), code)
        }
    };

    for segment in &response.content {
        if segment.error {
            eprintln!("{}", segment.text.red());
        } else {
            println!("{}", segment.text);
        }
    }

    exit_code
}

/// Write the effective configuration to `--config` or the default location
fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = path
        .or_else(Config::default_path)
        .context("No config path given and no home directory found")?;
    config
        .save(&path)
        .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
    println!("{} {}", "Saved configuration to".green(), path.display());
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", "Effective configuration".bold());
    println!("─────────────────────────────────────");
    print!("{}", rendered);
    if let Some(path) = Config::default_path() {
        println!();
        println!("Default config file: {}", path.display());
    }
    Ok(())
}
