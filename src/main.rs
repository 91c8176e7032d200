//! hdfs-bridge command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use hdfs_bridge::cli::{Args, Command};
use hdfs_bridge::commands;
use tracing::{error, info};

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    // Initialize tracing for logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_max_level(args.output.log_level())
        .with_writer(std::io::stderr)
        .init();

    let worker_threads = match &args.command {
        Command::Serve(serve) => serve.server.effective_worker_threads(),
        _ => 1,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    match &args.command {
        Command::Serve(serve) => {
            let stats = commands::serve(serve, shutdown_signal()).await?;
            info!(
                "Served {} reads ({} bytes) and {} writes ({} bytes)",
                stats.streams_opened, stats.bytes_read, stats.streams_created, stats.bytes_written
            );
        }
        Command::Ls(ls) => commands::ls(ls, &mut stdout).await?,
        Command::Cat(cat) => {
            commands::cat(cat, &mut stdout).await?;
        }
        Command::Put(put) => {
            let uploaded = commands::put(put).await?;
            info!("Uploaded {} bytes to {}", uploaded, put.path);
        }
        Command::Blocks(blocks) => commands::blocks(blocks, &mut stdout).await?,
    }
    Ok(())
}

/// Complete on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
