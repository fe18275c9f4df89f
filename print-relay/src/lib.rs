//! Print Relay - local agent between the ordering site and a receipt printer
//!
//! # Overview
//!
//! - **Configuration** (`config`): environment variables plus optional `config.json`
//! - **Relay API** (`client`): auto-print feed, manual queue, acknowledgments
//! - **Receipts** (`receipt`): orders rendered as ESC/POS
//! - **Service** (`service`): polling loops and print de-duplication
//!
//! ```text
//! print-relay/src/
//! ├── config.rs     # AgentConfig, env + file layering
//! ├── client.rs     # OrderSource trait, RelayApiClient
//! ├── receipt.rs    # ReceiptRenderer
//! ├── service.rs    # RelayService
//! ├── throttle.rs   # Feed error log de-duplication
//! └── logger.rs     # tracing setup
//! ```

pub mod client;
pub mod config;
pub mod logger;
pub mod receipt;
pub mod service;
pub mod throttle;

pub use client::{ClientError, ClientResult, OrderSource, RelayApiClient};
pub use config::{AgentConfig, AuthStrategy, ConfigError, ConfigResult, PrinterHost};
pub use logger::init_logger_with_file;
pub use receipt::{ReceiptBranding, ReceiptRenderer};
pub use service::RelayService;

use relay_printer::{Discovery, PrinterAddress};

/// Printer address from the configuration, or from a subnet scan
///
/// `None` means `auto` was configured and nothing answered.
pub async fn resolve_printer(config: &AgentConfig) -> Option<PrinterAddress> {
    match &config.printer_host {
        PrinterHost::Static(host) => {
            let addr = PrinterAddress::new(host.clone(), config.printer_port);
            tracing::info!(%addr, "Using configured printer");
            Some(addr)
        }
        PrinterHost::Auto => {
            let addr = Discovery::new(config.printer_port).discover().await?;
            tracing::info!(%addr, "Printer discovered");
            Some(addr)
        }
    }
}

pub fn print_banner(config: &AgentConfig) {
    println!(
        r#"
===========================================
  {} Print Relay
===========================================
  VPS:           {}
  Tenant:        {}
  Agent:         {}
  Poll interval: {}ms
  Printer:       {}
===========================================
"#,
        config.shop_name(),
        config.base_url(),
        config.tenant_slug,
        config.agent_name,
        config.poll_interval_ms,
        match &config.printer_host {
            PrinterHost::Auto => format!("auto (port {})", config.printer_port),
            PrinterHost::Static(host) => format!("{}:{}", host, config.printer_port),
        },
    );
}
