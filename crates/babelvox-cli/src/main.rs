use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use babelvox_core::config::{Config, LoggingConfig, port_from_env};
use babelvox_gateway::GatewayState;

#[derive(Parser)]
#[command(
    name = "babelvox",
    about = "WhatsApp voice translation bot: send a voice note, get it back spoken in your language",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Port to listen on (default: $PORT, then config, then 5000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show effective settings
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration, secrets masked
    Show,
    /// Validate the configuration
    Check,
}

/// Filter directives used when `RUST_LOG` is not set.
fn filter_directives(logging: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        logging.level.as_deref().unwrap_or("info")
    };
    std::iter::once(level)
        .chain(logging.filters.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let directives = filter_directives(logging, verbose);
    let filter = if verbose {
        EnvFilter::try_new(&directives)
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directives))
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = if logging.output == "stdout" {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

const MASK: &str = "********";

/// Copy of `config` with every inline secret replaced by a mask.
fn masked(config: &Config) -> Config {
    fn mask(field: &mut Option<String>) {
        if field.as_deref().is_some_and(|v| !v.is_empty()) {
            *field = Some(MASK.to_string());
        }
    }

    let mut config = config.clone();
    if let Some(openai) = config.openai.as_mut() {
        mask(&mut openai.api_key);
    }
    if let Some(whatsapp) = config.channels.as_mut().and_then(|c| c.whatsapp.as_mut()) {
        mask(&mut whatsapp.access_token);
        mask(&mut whatsapp.verify_token);
        mask(&mut whatsapp.app_secret);
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_dir);

    let config = Config::load(&config_path)?;
    init_logging(&config.logging.clone().unwrap_or_default(), cli.verbose);

    match cli.command {
        Commands::Serve { port } => {
            let (warnings, errors) = config.validate();
            for warning in &warnings {
                tracing::warn!("{warning}");
            }
            if !errors.is_empty() {
                for error in &errors {
                    tracing::error!("{error}");
                }
                anyhow::bail!("invalid configuration ({} errors)", errors.len());
            }

            let port = port
                .or_else(port_from_env)
                .unwrap_or_else(|| config.gateway_port());
            let bind = config.bind_addr();
            tracing::info!(
                config = %config_path.display(),
                "Starting Babelvox v{} on {bind}:{port}",
                env!("CARGO_PKG_VERSION")
            );

            let state = Arc::new(GatewayState::from_config(&config));
            babelvox_gateway::start_gateway(state, &bind, port).await?;
        }
        Commands::Status => {
            let openai = config.openai();
            let whatsapp = config.whatsapp();
            println!("Babelvox v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!(
                "Listen: {}:{}",
                config.bind_addr(),
                port_from_env().unwrap_or_else(|| config.gateway_port())
            );
            println!(
                "Models: {} / {} / {} (voice {})",
                openai.transcription_model, openai.chat_model, openai.tts_model, openai.voice
            );
            println!("Graph API: {}/{}", whatsapp.graph_base_url, whatsapp.api_version);
            println!(
                "Signature check: {}",
                if whatsapp.resolve_app_secret().is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&masked(&config))?;
                println!("{json}");
            }
            ConfigAction::Check => {
                let (warnings, errors) = config.validate();
                for warning in &warnings {
                    println!("warning: {warning}");
                }
                for error in &errors {
                    println!("error: {error}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} configuration errors", errors.len());
                }
                println!("Configuration OK ({} warnings)", warnings.len());
            }
        },
    }

    Ok(())
}
