//! ProductWatch agent: entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::{prelude::*, reload, EnvFilter, Registry};

use product_watch::{CoordinatorBus, Document, TitlePipeline};
use product_watch_agent::config::{load_config, resolve_config_path, resolve_store_path};
use product_watch_agent::protocol::{LogControl, ProtocolHandler};
use product_watch_agent::session::WatchSession;
use product_watch_agent::transport::StdioTransport;
use product_watch_agent::types::{AgentError, AgentResult};

#[derive(Parser)]
#[command(
    name = "product-watch-agent",
    about = "Watches a live-selling page for the active product and reports title changes",
    version
)]
struct Cli {
    /// Page URL to watch.
    #[arg(long)]
    url: Option<String>,

    /// Path to a JSON config file.
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a page over stdio (default).
    Watch {
        /// Page URL to watch.
        #[arg(long)]
        url: Option<String>,

        /// Path to a JSON config file.
        #[arg(short, long)]
        config: Option<String>,

        /// Path to the durable title store.
        #[arg(long)]
        store: Option<String>,

        /// Log level (trace, debug, info, warn, error).
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Run the title pipeline once over an HTML file and print the result.
    Check {
        /// Page URL the HTML was captured from.
        #[arg(long)]
        url: String,

        /// HTML file to inspect.
        #[arg(long)]
        html: PathBuf,

        /// Path to a JSON config file.
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print the resolved configuration as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   product-watch-agent completions bash > ~/.local/share/bash-completion/completions/product-watch-agent
    ///   product-watch-agent completions zsh > ~/.zfunc/_product-watch-agent
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

/// Swaps the live filter between `debug` and the configured level.
struct ReloadLogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    base_level: String,
}

impl LogControl for ReloadLogControl {
    fn set_debug(&self, enabled: bool) -> AgentResult<()> {
        let directive = if enabled { "debug" } else { self.base_level.as_str() };
        self.handle
            .reload(EnvFilter::new(directive))
            .map_err(|e| AgentError::Logging(e.to_string()))
    }
}

fn init_logging(level: &str) -> reload::Handle<EnvFilter, Registry> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    handle
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match &cli.command {
        Some(Commands::Watch {
            log_level: Some(level),
            ..
        }) => level.clone(),
        _ => cli.log_level.clone(),
    };
    let log_handle = init_logging(&log_level);

    match cli.command.unwrap_or(Commands::Watch {
        url: None,
        config: None,
        store: None,
        log_level: None,
    }) {
        Commands::Watch {
            url,
            config,
            store,
            log_level: _,
        } => {
            let url = url
                .or(cli.url)
                .ok_or_else(|| anyhow::anyhow!("--url is required to watch a page"))?;
            let config_path = resolve_config_path(config.or(cli.config).as_deref());
            let config = load_config(config_path.as_deref())?;
            let store_path = resolve_store_path(store.as_deref());

            tracing::info!("ProductWatch agent");
            tracing::info!("Store: {}", store_path.display());

            let session = WatchSession::new(config, Some(store_path), CoordinatorBus::default());
            let log = ReloadLogControl {
                handle: log_handle,
                base_level: log_level,
            };
            let handler = ProtocolHandler::new(session, Box::new(log));

            let local = tokio::task::LocalSet::new();
            local
                .run_until(async move {
                    let mut transport = StdioTransport::new(handler);
                    transport.handler_mut().navigate(&url, None).await;
                    transport.run().await
                })
                .await?;
        }

        Commands::Check { url, html, config } => {
            let config_path = resolve_config_path(config.or(cli.config).as_deref());
            let config = load_config(config_path.as_deref())?;
            let markup = std::fs::read_to_string(&html)?;

            let supported = config.is_supported(&url);
            let pipeline = TitlePipeline::from_profile(&config.profile_for(&url), &config);
            let outcome = pipeline.run(&Document::parse(&markup));

            let report = serde_json::json!({
                "url": url,
                "supported": supported,
                "result": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Info => {
            let config_path = resolve_config_path(cli.config.as_deref());
            let config = load_config(config_path.as_deref())?;
            let info = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "configPath": config_path.map(|p| p.display().to_string()),
                "storePath": resolve_store_path(None).display().to_string(),
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "product-watch-agent",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
