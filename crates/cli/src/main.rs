mod config;
mod error;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mcp::{ServerParams, StdioSession};
use runtime::ChatBridge;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, process_env};
use error::Result;

const DEFAULT_QUERY: &str =
    "I am planning for a Vacation, i need to know if our company has a policy regarding that ?";

#[derive(Parser)]
#[command(name = "toolbridge")]
#[command(about = "Call MCP tools over stdio, directly or through a hosted chat model", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./toolbridge.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log protocol and model traffic at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the server's tools and call `add` with a=2, b=3
    Demo {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Answer a query with a hosted model that may call the server's tools
    Chat {
        /// The question to ask
        query: Option<String>,

        /// Azure OpenAI deployment name
        #[arg(short, long)]
        deployment: Option<String>,

        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(Args)]
struct ServerArgs {
    /// Interpreter or executable that runs the tool server
    #[arg(long)]
    server_command: Option<String>,

    /// Argument for the server command (repeatable)
    #[arg(long = "server-arg")]
    server_args: Vec<String>,
}

impl ServerArgs {
    /// Flags override the configured server; `--server-arg` alone keeps the
    /// configured command.
    fn resolve(self, configured: &ServerParams) -> ServerParams {
        match (self.server_command, self.server_args.is_empty()) {
            (None, true) => configured.clone(),
            (command, _) => ServerParams {
                command: command.unwrap_or_else(|| configured.command.clone()),
                args: self.server_args,
                env: configured.env.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo { server } => cmd_demo(server.resolve(&config.server)).await,
        Commands::Chat {
            query,
            deployment,
            server,
        } => {
            let query = query.unwrap_or_else(|| DEFAULT_QUERY.to_string());
            let params = server.resolve(&config.server);
            cmd_chat(&config, params, deployment.as_deref(), &query).await
        }
    }
}

fn init_tracing(verbose: bool) {
    // stdout carries flow output; logs go to stderr
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn cmd_demo(params: ServerParams) -> Result<()> {
    info!(server = %params, "starting stdio demo");
    let session = StdioSession::spawn(&params)?;

    let mut stdout = io::stdout();
    runtime::run_stdio_demo(session, &mut stdout).await?;
    stdout.flush()?;
    Ok(())
}

async fn cmd_chat(
    config: &Config,
    params: ServerParams,
    deployment: Option<&str>,
    query: &str,
) -> Result<()> {
    // Resolve credentials before spawning anything.
    let backend = config.backend(deployment, process_env)?;
    info!(%backend, server = %params, "starting chat bridge");

    let session = StdioSession::spawn(&params)?;
    let mut stdout = io::stdout();
    let bridge = ChatBridge::connect(backend, session, &mut stdout).await?;

    println!("\nQuery: {query}");
    let result = bridge.process_query(query).await;
    let response = bridge.finish(result).await?;
    println!("\nResponse: {response}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ServerParams {
        ServerParams::new("python", ["server.py"])
    }

    #[test]
    fn cli_parses_chat_flags() {
        let cli = Cli::try_parse_from([
            "toolbridge",
            "chat",
            "is there a policy?",
            "--deployment",
            "gpt-4o-mini",
            "--server-command",
            "uv",
            "--server-arg",
            "run",
            "--server-arg",
            "server.py",
        ])
        .unwrap();

        match cli.command {
            Commands::Chat {
                query,
                deployment,
                server,
            } => {
                assert_eq!(query.as_deref(), Some("is there a policy?"));
                assert_eq!(deployment.as_deref(), Some("gpt-4o-mini"));
                assert_eq!(
                    server.resolve(&configured()),
                    ServerParams::new("uv", ["run", "server.py"])
                );
            }
            Commands::Demo { .. } => panic!("expected chat"),
        }
    }

    #[test]
    fn demo_without_flags_uses_configured_server() {
        let cli = Cli::try_parse_from(["toolbridge", "demo"]).unwrap();
        let Commands::Demo { server } = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(server.resolve(&configured()), configured());
    }

    #[test]
    fn server_args_alone_keep_configured_command() {
        let args = ServerArgs {
            server_command: None,
            server_args: vec!["other.py".into()],
        };
        assert_eq!(
            args.resolve(&configured()),
            ServerParams::new("python", ["other.py"])
        );
    }
}
