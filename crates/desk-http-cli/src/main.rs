//! Command line client for desk-http

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use desk_http::{
    install_shared, Environment, HttpClient, LogBuffer, LogBufferLayer, MemorySessionStore,
    Settings,
};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod sub_commands;

const LOG_BUFFER_CAPACITY: usize = 1000;

/// Send requests through the same client the application uses
#[derive(Parser)]
#[command(name = "desk-http")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Session token sent as a bearer token
    #[arg(short, long, env = "DESK_HTTP_TOKEN")]
    token: Option<String>,
    /// Logging level
    #[arg(short, long, default_value = "warn")]
    log_level: Level,
    /// Print the captured log as JSON when done
    #[arg(long)]
    dump_log: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(sub_commands::request::RequestSubCommand),
    /// Send a POST request
    Post(sub_commands::request::RequestSubCommand),
    /// Send a PUT request
    Put(sub_commands::request::RequestSubCommand),
    /// Send a PATCH request
    Patch(sub_commands::request::RequestSubCommand),
    /// Send a DELETE request
    Delete(sub_commands::request::RequestSubCommand),
    /// Show the resolved client configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    let log_buffer = Arc::new(LogBuffer::new(LOG_BUFFER_CAPACITY, LevelFilter::INFO));
    let env_filter = EnvFilter::new(format!("{},hyper=warn,rustls=warn", args.log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .with(LogBufferLayer::new(log_buffer.clone()))
        .init();

    let settings = Settings::new(args.config.clone()).from_env();
    let session = Arc::new(MemorySessionStore::new(args.token.clone()));
    let client = install_shared(HttpClient::from_settings(
        &settings,
        &Environment::detect(),
        session,
    )?)?;

    let result = match &args.command {
        Commands::Get(sub_command_args) => {
            sub_commands::request::request(client.get(&sub_command_args.path), sub_command_args)
                .await
        }
        Commands::Post(sub_command_args) => {
            sub_commands::request::request(client.post(&sub_command_args.path), sub_command_args)
                .await
        }
        Commands::Put(sub_command_args) => {
            sub_commands::request::request(client.put(&sub_command_args.path), sub_command_args)
                .await
        }
        Commands::Patch(sub_command_args) => {
            sub_commands::request::request(client.patch(&sub_command_args.path), sub_command_args)
                .await
        }
        Commands::Delete(sub_command_args) => {
            sub_commands::request::request(client.delete(&sub_command_args.path), sub_command_args)
                .await
        }
        Commands::ShowConfig => sub_commands::show_config::show_config(client),
    };

    if args.dump_log {
        let (entries, _) = log_buffer.since(None, None);
        eprintln!("{}", serde_json::to_string_pretty(&entries)?);
    }

    result
}
