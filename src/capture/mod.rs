//! Packet capture abstractions.
//!
//! A [`CaptureBackend`] opens a [`FrameSource`] on a named interface. The
//! live implementation wraps libpcap ([`live::PcapBackend`]); tests supply
//! in-memory sources. Sources are blocking and are driven from tokio's
//! blocking pool by the capture session.

use std::net::IpAddr;

use etherparse::{LinkSlice, NetSlice, SlicedPacket, TransportSlice};

use crate::magic::MacAddress;

pub mod filter;
pub mod live;

/// Capture snapshot length in bytes.
pub const SNAPLEN: i32 = 1600;

/// Errors from opening or reading a capture handle.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The capture device could not be opened.
    #[error("failed to open capture device {interface}: {reason}")]
    Open {
        /// Interface name.
        interface: String,
        /// Backend error description.
        reason: String,
    },
    /// The BPF filter could not be compiled or installed.
    #[error("failed to set BPF filter '{filter}': {reason}")]
    Filter {
        /// Filter expression.
        filter: String,
        /// Backend error description.
        reason: String,
    },
    /// Reading the next frame failed; the session ends.
    #[error("failed to read from capture device {interface}: {reason}")]
    Read {
        /// Interface name.
        interface: String,
        /// Backend error description.
        reason: String,
    },
    /// The blocking capture task panicked or was cancelled.
    #[error("capture task on {interface} failed: {reason}")]
    Fault {
        /// Interface name.
        interface: String,
        /// Join error description.
        reason: String,
    },
}

/// One captured frame, decoded as far as the pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// UDP payload, or `None` when the frame has no application layer.
    pub payload: Option<Vec<u8>>,
    /// Ethernet source address, when present.
    pub src_mac: Option<MacAddress>,
    /// IP source address, when present.
    pub src_ip: Option<IpAddr>,
}

impl Frame {
    /// Decode an Ethernet II frame.
    ///
    /// Frames that fail to decode yield an empty [`Frame`], which the
    /// payload validator rejects as empty.
    pub fn from_ethernet(data: &[u8]) -> Self {
        let Ok(sliced) = SlicedPacket::from_ethernet(data) else {
            return Self::default();
        };

        let src_mac = match &sliced.link {
            Some(LinkSlice::Ethernet2(eth)) => Some(MacAddress::new(eth.source())),
            _ => None,
        };

        let src_ip = match &sliced.net {
            Some(NetSlice::Ipv4(ip)) => Some(IpAddr::V4(ip.header().source_addr())),
            Some(NetSlice::Ipv6(ip)) => Some(IpAddr::V6(ip.header().source_addr())),
            _ => None,
        };

        let payload = match &sliced.transport {
            Some(TransportSlice::Udp(udp)) => Some(udp.payload().to_vec()),
            _ => None,
        };

        Self {
            payload,
            src_mac,
            src_ip,
        }
    }

    /// Human-readable source, e.g. `AA:BB:CC:DD:EE:FF/192.168.1.10`.
    pub fn source_description(&self) -> String {
        let mac = self
            .src_mac
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unknown MAC".to_owned());
        let ip = self
            .src_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown IP".to_owned());
        format!("{mac}/{ip}")
    }
}

/// An open capture handle yielding frames.
pub trait FrameSource: Send {
    /// Install a BPF filter expression.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Filter`] if the expression is rejected.
    fn set_filter(&mut self, filter: &str) -> Result<(), CaptureError>;

    /// Block until the next frame arrives.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Read`] when the handle fails.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// Opens capture handles on named interfaces.
pub trait CaptureBackend: Send + Sync {
    /// Open a blocking capture on `interface` with [`SNAPLEN`].
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Open`] if the device cannot be opened.
    fn open(&self, interface: &str, promiscuous: bool)
        -> Result<Box<dyn FrameSource>, CaptureError>;
}
