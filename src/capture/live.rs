//! libpcap-backed live capture.

use pcap::{Active, Capture};
use tracing::debug;

use super::{CaptureBackend, CaptureError, Frame, FrameSource, SNAPLEN};

/// Opens live captures through libpcap.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcapBackend;

impl PcapBackend {
    /// Create a libpcap backend.
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for PcapBackend {
    fn open(
        &self,
        interface: &str,
        promiscuous: bool,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        let open_err = |e: pcap::Error| CaptureError::Open {
            interface: interface.to_owned(),
            reason: e.to_string(),
        };

        // A zero read timeout blocks until a packet arrives.
        let capture = Capture::from_device(interface)
            .map_err(open_err)?
            .snaplen(SNAPLEN)
            .promisc(promiscuous)
            .timeout(0)
            .open()
            .map_err(open_err)?;

        debug!(interface = %interface, promiscuous, "capture device opened");
        Ok(Box::new(PcapSource {
            interface: interface.to_owned(),
            capture,
        }))
    }
}

/// Live capture handle on one interface.
pub struct PcapSource {
    interface: String,
    capture: Capture<Active>,
}

impl FrameSource for PcapSource {
    fn set_filter(&mut self, filter: &str) -> Result<(), CaptureError> {
        self.capture
            .filter(filter, true)
            .map_err(|e| CaptureError::Filter {
                filter: filter.to_owned(),
                reason: e.to_string(),
            })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        loop {
            match self.capture.next_packet() {
                Ok(packet) => return Ok(Some(Frame::from_ethernet(packet.data))),
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(pcap::Error::NoMorePackets) => return Ok(None),
                Err(e) => {
                    return Err(CaptureError::Read {
                        interface: self.interface.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }
    }
}
