//! # relay-printer
//!
//! Thermal receipt printer plumbing - everything below "what goes on the paper".
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - Windows-1252 transcoding for Latin text
//! - Network printing (raw TCP, port 9100)
//! - Retry of failed jobs
//! - Finding a printer on the local /24
//!
//! Receipt layout (WHAT to print) stays in the relay agent.
//!
//! ## Example
//!
//! ```ignore
//! use relay_printer::{EscPosBuilder, NetworkPrinter, PrinterAddress, RetryPolicy, send_with_retry};
//!
//! let mut builder = EscPosBuilder::new(32);
//! builder.center().double_size().line("ORDER #ABC123").reset_size();
//! builder.left().line_lr("Tax:", "$1.50");
//! builder.cut_partial();
//!
//! let printer = NetworkPrinter::new(PrinterAddress::new("192.168.1.108", 9100))?;
//! send_with_retry(&printer, &builder.build(), &RetryPolicy::default()).await?;
//! ```

mod discovery;
mod encoding;
mod error;
mod escpos;
mod printer;
mod retry;

// Re-exports
pub use discovery::{
    Discovery, PRIORITY_SUFFIXES, Probe, SCAN_BATCH_SIZE, TcpProbe, local_ipv4,
};
pub use encoding::{convert_to_cp1252, pad_text, text_width, truncate_text};
pub use error::{PrintError, PrintResult};
pub use escpos::EscPosBuilder;
pub use printer::{DEFAULT_PRINTER_PORT, NetworkPrinter, PROBE_TIMEOUT, Printer, PrinterAddress};
pub use retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy, send_with_retry};
