use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use scenebridge::bridge::{BridgeServer, CommandDispatcher, MainThreadScheduler};
use scenebridge::cli::{Cli, Commands, init_config, resolve_config, run_bridge_command};
use scenebridge::config::Config;
use scenebridge::host::{Host, HostApp};
use scenebridge::logging::setup_logging;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle --init flag
    if cli.init {
        return init_config(&cli.config);
    }

    let config = resolve_config(&cli)?;

    match &cli.command {
        None | Some(Commands::Serve) => serve(config, cli.log_json),
        Some(command) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(run_bridge_command(&config, command))
        }
    }
}

/// Run the host loop on this thread and the bridge on a tokio runtime until Ctrl-C
fn serve(config: Config, log_json: bool) -> anyhow::Result<()> {
    setup_logging(&config.logging, log_json)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("bridge-io")
        .build()
        .context("Failed to start async runtime")?;

    let scheduler = MainThreadScheduler::new();
    let server = runtime
        .block_on(BridgeServer::bind(
            &config.host,
            config.port,
            scheduler.clone(),
            config.max_frame_bytes,
        ))
        .with_context(|| format!("Failed to bind bridge to {}:{}", config.host, config.port))?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_task = runtime.spawn(server.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    let host = Host::new(config.initial_scene(), config.layout())
        .with_asset_libraries(config.asset_libraries.clone());
    info!(
        objects = host.scene.len(),
        headless = config.headless,
        libraries = host.asset_libraries.len(),
        "host ready"
    );

    let mut app = HostApp::new(
        host,
        scheduler,
        CommandDispatcher::new(config.screenshot_max_size),
    );
    // The host state never leaves this thread
    app.run(&stop, config.tick_interval());

    let _ = shutdown_tx.send(());
    match runtime.block_on(server_task) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "bridge stopped with an error"),
        Err(e) => warn!(error = %e, "bridge task failed"),
    }
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
