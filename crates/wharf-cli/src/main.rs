//! Command-line interface for the Wharf component manager.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wharf_core::{Component, ComponentManager, ExtensionsRoot};

/// Wharf - install and serve host application components.
#[derive(Parser, Debug)]
#[command(name = "wharf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Application data directory holding the Extensions tree.
    #[arg(short, long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the local asset server.
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to bind to.
        #[arg(short, long, default_value_t = wharf_server::DEFAULT_PORT)]
        port: u16,
    },
    /// Reconcile the full component set from a manifest file.
    Sync {
        /// JSON file holding the desired component array.
        manifest: PathBuf,
    },
    /// Install each component from a manifest file unconditionally.
    Install {
        /// JSON file holding the component array to install.
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let root = ExtensionsRoot::new(&args.data_dir);
    match args.command {
        Command::Serve { host, port } => {
            let bind: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid bind address {host}:{port}"))?;
            wharf_server::run(bind, root).await
        }
        Command::Sync { manifest } => run_manifest(root, &manifest, false).await,
        Command::Install { manifest } => run_manifest(root, &manifest, true).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "wharf=debug" } else { "wharf=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(default_filter)
            .add_directive(tracing::Level::WARN.into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Load a component manifest and either reconcile it as the desired set or
/// force-install every entry. Completion notifications are printed as JSON
/// lines while the run is in flight.
async fn run_manifest(root: ExtensionsRoot, manifest: &std::path::Path, force_install: bool) -> Result<()> {
    let bytes = tokio::fs::read(manifest)
        .await
        .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
    let components: Vec<Component> = serde_json::from_slice(&bytes)
        .with_context(|| format!("invalid component manifest {}", manifest.display()))?;

    let manager = Arc::new(ComponentManager::new(root));
    let mut events = manager.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
            }
        }
    });

    if force_install {
        for component in components {
            let _ = manager.install(component).await;
        }
    } else {
        manager.sync(components).await;
    }

    // Pending mapping writes must land before exit.
    manager.mapping().flush().await;
    printer.abort();
    Ok(())
}
