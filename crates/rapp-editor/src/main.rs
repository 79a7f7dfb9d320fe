//! Editor backend command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use rapp_editor::{serve, serve_devtool, EditorBackend, EditorConfig};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("rapp-editor")
        .version(rapp_editor::VERSION)
        .about("Reactive App editor backend")
        .arg(
            Arg::new("root")
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Project root containing package.json"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_parser(value_parser!(u16))
                .help("Editor WebSocket port"),
        )
        .arg(
            Arg::new("devtool-port")
                .long("devtool-port")
                .value_parser(value_parser!(u16))
                .help("Port instrumented programs report to"),
        )
        .arg(
            Arg::new("open-command")
                .long("open-command")
                .help("Program run with the class file path on class-open"),
        )
        .arg(
            Arg::new("no-watch")
                .long("no-watch")
                .action(ArgAction::SetTrue)
                .help("Do not watch the class directory"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Log as JSON"),
        );

    let matches = cli.get_matches();
    init_tracing(matches.get_flag("json"));

    let root = matches
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = EditorConfig::load(&root).await;
    if let Some(port) = matches.get_one::<u16>("port") {
        config = config.with_port(*port);
    }
    if let Some(port) = matches.get_one::<u16>("devtool-port") {
        config = config.with_devtool_port(*port);
    }
    if let Some(command) = matches.get_one::<String>("open-command") {
        config = config.with_open_command(command);
    }
    if matches.get_flag("no-watch") {
        config = config.with_watch(false);
    }

    let editor_listener = TcpListener::bind(config.editor_bind())
        .await
        .with_context(|| format!("binding editor endpoint {}", config.editor_bind()))?;
    let devtool_listener = TcpListener::bind(config.devtool_bind())
        .await
        .with_context(|| format!("binding devtool endpoint {}", config.devtool_bind()))?;

    let backend = EditorBackend::start(config)
        .await
        .context("preparing project")?;

    tokio::select! {
        result = serve(editor_listener, backend.clone()) => result.context("editor endpoint")?,
        result = serve_devtool(devtool_listener, backend.clone()) => result.context("devtool endpoint")?,
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for ctrl-c")?;
            tracing::info!("shutting down");
        }
    }
    backend.stop_watching();
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
