//! Printer adapters for sending ESC/POS data
//!
//! Network printers take raw ESC/POS on TCP port 9100. One connection is
//! opened per job: connect, write everything, half-close, then wait for the
//! printer to close its side. No application-level acknowledgment exists.

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

/// Default raw printing port (JetDirect)
pub const DEFAULT_PRINTER_PORT: u16 = 9100;

/// Connect timeout for print jobs
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle timeout while writing or waiting for the printer to close
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect timeout for reachability probes
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Trait for printer adapters
#[async_trait]
pub trait Printer: Send + Sync {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;
}

/// Where a printer listens
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrinterAddress {
    pub host: String,
    pub port: u16,
}

impl PrinterAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PrinterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: PrinterAddress,
    idle_timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(addr: PrinterAddress) -> PrintResult<Self> {
        if addr.host.trim().is_empty() {
            return Err(PrintError::InvalidConfig("Empty printer host".to_string()));
        }
        if addr.port == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid printer port: {}",
                addr.port
            )));
        }

        Ok(Self {
            addr,
            idle_timeout: IDLE_TIMEOUT,
        })
    }

    /// Set the write/close idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> &PrinterAddress {
        &self.addr
    }

    async fn connect(&self, timeout: Duration) -> PrintResult<TcpStream> {
        tokio::time::timeout(
            timeout,
            TcpStream::connect((self.addr.host.as_str(), self.addr.port)),
        )
        .await
        .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
        .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))
    }
}

#[async_trait]
impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        debug!("Connecting to printer");

        let mut stream = self.connect(CONNECT_TIMEOUT).await?;

        debug!("Connected, sending {} bytes", data.len());

        tokio::time::timeout(self.idle_timeout, stream.write_all(data))
            .await
            .map_err(|_| PrintError::Timeout(format!("Write timeout: {}", self.addr)))?
            .map_err(|e| {
                PrintError::Io(std::io::Error::new(e.kind(), format!("Write failed: {}", e)))
            })?;

        // Half-close: the firmware takes FIN as "job complete"
        stream.shutdown().await?;

        // Printers never answer; drain until they close their side
        let mut sink = [0u8; 256];
        loop {
            let n = tokio::time::timeout(self.idle_timeout, stream.read(&mut sink))
                .await
                .map_err(|_| PrintError::Timeout(format!("Close timeout: {}", self.addr)))??;
            if n == 0 {
                break;
            }
        }

        info!("Print job sent successfully");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        match self.connect(PROBE_TIMEOUT).await {
            Ok(_) => {
                debug!("Printer online");
                true
            }
            Err(e) => {
                debug!(error = %e, "Printer offline");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_invalid_addr() {
        assert!(NetworkPrinter::new(PrinterAddress::new("", 9100)).is_err());
        assert!(NetworkPrinter::new(PrinterAddress::new("  ", 9100)).is_err());
        assert!(NetworkPrinter::new(PrinterAddress::new("10.0.0.5", 0)).is_err());

        let printer = NetworkPrinter::new(PrinterAddress::new("192.168.1.100", 9100)).unwrap();
        assert_eq!(printer.addr().to_string(), "192.168.1.100:9100");
    }

    #[tokio::test]
    async fn test_is_online_with_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let printer = NetworkPrinter::new(PrinterAddress::new("127.0.0.1", port)).unwrap();
        assert!(printer.is_online().await);
    }

    #[tokio::test]
    async fn test_print_delivers_all_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
            // socket dropped here, closing our side
        });

        let printer = NetworkPrinter::new(PrinterAddress::new("127.0.0.1", port)).unwrap();
        let payload = b"\x1b@hello printer\n\x1dV\x01".to_vec();
        printer.print(&payload).await.unwrap();

        assert_eq!(server.await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_print_fails_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let printer = NetworkPrinter::new(PrinterAddress::new("127.0.0.1", port)).unwrap();
        assert!(printer.print(b"x").await.is_err());
        assert!(!printer.is_online().await);
    }

    #[tokio::test]
    async fn test_print_times_out_when_printer_never_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            // Hold the connection open without reading to EOF or closing
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let printer = NetworkPrinter::new(PrinterAddress::new("127.0.0.1", port))
            .unwrap()
            .with_idle_timeout(Duration::from_millis(200));
        let err = printer.print(b"x").await.unwrap_err();
        assert!(matches!(err, PrintError::Timeout(_)));
    }
}
