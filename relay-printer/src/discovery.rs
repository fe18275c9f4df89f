//! Network discovery for raw-TCP printers
//!
//! Finds a device accepting connections on the printer port somewhere in the
//! local /24. A hit only means "something listens on 9100", not "this is a
//! receipt printer"; on a network with two such devices the first one wins.
//!
//! Scan order:
//! 1. A short list of host suffixes printers commonly get, one at a time
//! 2. The rest of `.1`-`.254`, in batches of concurrent probes

use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::printer::{DEFAULT_PRINTER_PORT, NetworkPrinter, Printer, PrinterAddress};

/// Host suffixes tried before the full sweep
pub const PRIORITY_SUFFIXES: [u8; 7] = [108, 44, 100, 101, 102, 50, 51];

/// Concurrent probes per batch
pub const SCAN_BATCH_SIZE: usize = 50;

/// Reachability check for one candidate address
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, addr: &PrinterAddress) -> bool;
}

/// Connect check through [`NetworkPrinter::is_online`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, addr: &PrinterAddress) -> bool {
        match NetworkPrinter::new(addr.clone()) {
            Ok(printer) => printer.is_online().await,
            Err(_) => false,
        }
    }
}

/// First usable IPv4 address among this machine's interfaces
///
/// Interfaces are listed directly, so this works on a LAN without a
/// default gateway.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => first_lan_ipv4(interfaces),
        Err(e) => {
            warn!(error = %e, "Failed to list network interfaces");
            None
        }
    }
}

/// Skips loopback, unspecified and link-local (169.254.x.x) addresses
fn first_lan_ipv4(interfaces: impl IntoIterator<Item = (String, IpAddr)>) -> Option<Ipv4Addr> {
    interfaces.into_iter().find_map(|(name, ip)| match ip {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() && !ip.is_link_local() => {
            debug!(interface = %name, %ip, "Using interface for discovery");
            Some(ip)
        }
        _ => None,
    })
}

/// Subnet scanner
pub struct Discovery<P = TcpProbe> {
    probe: P,
    port: u16,
    batch_size: usize,
}

impl Discovery<TcpProbe> {
    /// Scanner probing `port` with plain TCP connects
    pub fn new(port: u16) -> Self {
        Self::with_probe(TcpProbe, port)
    }
}

impl Default for Discovery<TcpProbe> {
    fn default() -> Self {
        Self::new(DEFAULT_PRINTER_PORT)
    }
}

impl<P: Probe> Discovery<P> {
    pub fn with_probe(probe: P, port: u16) -> Self {
        Self {
            probe,
            port,
            batch_size: SCAN_BATCH_SIZE,
        }
    }

    /// Set concurrent probes per batch (minimum 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Scan the local /24
    ///
    /// `None` is the normal outcome on a network without a reachable printer,
    /// or when the local address cannot be determined.
    pub async fn discover(&self) -> Option<PrinterAddress> {
        let Some(local) = local_ipv4() else {
            warn!("Could not determine local network address");
            return None;
        };
        self.scan_subnet(local).await
    }

    /// Scan the /24 that `local` belongs to, skipping `local` itself
    #[instrument(skip(self), fields(port = self.port))]
    pub async fn scan_subnet(&self, local: Ipv4Addr) -> Option<PrinterAddress> {
        let [a, b, c, own] = local.octets();
        let candidate =
            |suffix: u8| PrinterAddress::new(Ipv4Addr::new(a, b, c, suffix).to_string(), self.port);

        info!(subnet = %format!("{a}.{b}.{c}.x"), local = %local, "Scanning for printers");

        for &suffix in PRIORITY_SUFFIXES.iter().filter(|&&s| s != own) {
            let addr = candidate(suffix);
            if self.probe.probe(&addr).await {
                info!(addr = %addr, "Printer found at priority address");
                return Some(addr);
            }
            debug!(addr = %addr, "No answer");
        }

        let remaining: Vec<PrinterAddress> = (1..=254u8)
            .filter(|s| *s != own && !PRIORITY_SUFFIXES.contains(s))
            .map(candidate)
            .collect();

        // Each batch settles completely before the next one starts
        for batch in remaining.chunks(self.batch_size) {
            let results = join_all(batch.iter().map(|addr| self.probe.probe(addr))).await;
            if let Some((addr, _)) = batch.iter().zip(results).find(|(_, hit)| *hit) {
                info!(addr = %addr, "Printer found");
                return Some(addr.clone());
            }
        }

        info!("No printer found on subnet");
        None
    }
}
