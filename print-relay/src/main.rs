use std::sync::Arc;

use anyhow::{Context, bail};
use print_relay::{
    AgentConfig, ReceiptRenderer, RelayApiClient, RelayService, init_logger_with_file,
    print_banner, resolve_printer,
};
use relay_printer::NetworkPrinter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment: .env, config, logging
    let _ = dotenv::dotenv();
    let (config, file_error) = AgentConfig::load();
    let _log_guard = init_logger_with_file(&config.log_level, config.log_dir.as_deref());
    if let Some(e) = file_error {
        tracing::error!(error = %e, "Ignoring config file");
    }

    print_banner(&config);
    config.validate().context("Invalid configuration")?;

    // 2. Printer address
    let Some(addr) = resolve_printer(&config).await else {
        tracing::error!(
            "No thermal printer found on the network. Check that the printer is powered on \
             and on the same WiFi, or set PRINTER_HOST."
        );
        bail!("printer discovery failed");
    };

    // 3. Collaborators
    let printer = NetworkPrinter::new(addr).context("Invalid printer address")?;
    let client = RelayApiClient::new(&config).context("Failed to build HTTP client")?;
    let renderer = ReceiptRenderer::from_config(&config)?;

    // 4. Run until signalled; a signal during the startup test print stops too
    let service = Arc::new(RelayService::new(
        Arc::new(client),
        Arc::new(printer),
        renderer,
        config.poll_interval(),
    ));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let started = tokio::select! {
        _ = service.start() => true,
        _ = &mut shutdown => false,
    };
    if started {
        shutdown.await;
    }
    service.stop();

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, stopping print relay...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, stopping print relay...");
        },
    }
}
