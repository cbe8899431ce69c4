use anyhow::Result;
use clap::Parser;
use scribed::cli::Cli;
use scribed::config::Config;
use scribed::engine::{EngineContext, NullEngine, SpeechEngine};
use scribed::server::Server;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?.with_env_overrides()?;
    let config = cli.apply_to(config);

    let engine: Arc<dyn SpeechEngine> = Arc::new(NullEngine::new(&config.engine.model));
    let context = Arc::new(EngineContext::new(engine, &config));

    let server = Server::bind(&config.server.host, config.server.port)
        .await?
        .with_dedup(config.dedup.clone().into());

    info!(
        version = %scribed::version_string(),
        addr = %server.local_addr(),
        engine = context.engine_name(),
        language = context.default_language(),
        "scribed listening"
    );

    let shutdown = server.shutdown_handle();
    let server_handle = tokio::spawn(async move { server.serve(context).await });

    // Wait for SIGTERM or SIGINT
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                tracing::error!("signal handler setup failed: {e}");
            }
            info!("received SIGTERM, shutting down");
        }
    }

    shutdown.shutdown().await;

    match server_handle.await {
        Ok(Err(e)) => tracing::error!("server exited with error: {e}"),
        Err(e) => tracing::error!("server task failed: {e}"),
        Ok(Ok(())) => {}
    }

    info!("server stopped");
    Ok(())
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows -q / -v flags.
fn init_tracing(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "scribed=error"
    } else {
        match verbose {
            0 => "scribed=info",
            1 => "scribed=debug",
            _ => "scribed=trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

/// Wait for SIGTERM signal (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    // On non-Unix, just wait forever (Ctrl+C will still work)
    std::future::pending::<()>().await
}
