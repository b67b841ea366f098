//! Per-interface capture session and the per-packet wake pipeline.
//!
//! A session opens its interface, installs the BPF filter, and then feeds
//! frames one at a time through validate → resolve → check → dispatch.
//! The next frame is read only after the previous one has been handled, so
//! any buffering is left to the capture layer. Each frame's outcome is an
//! explicit [`Result`]; the run loop logs failures and moves on.

use std::sync::Arc;

use tracing::debug;

use crate::capture::filter::build_filter;
use crate::capture::{CaptureBackend, CaptureError, Frame, FrameSource};
use crate::config::ListenSpec;
use crate::logging::Logger;
use crate::magic::{self, MacAddress, PayloadError};
use crate::power::{PowerDispatcher, PowerError, PowerOutcome};
use crate::resolver::{DescriptorResolver, ResolveError};
use crate::target::TargetError;

/// The source handed back from the blocking pool along with what it read.
type ReadOutcome = (Box<dyn FrameSource>, Result<Option<Frame>, CaptureError>);

/// Why a frame did not lead to a power-on.
#[derive(Debug, thiserror::Error)]
pub enum WakeError {
    /// The frame is not a magic packet.
    #[error("received invalid packet: {0}")]
    Payload(#[from] PayloadError),
    /// Descriptor lookup failed.
    #[error("error searching for MAC address {mac}: {source}")]
    Resolve {
        /// MAC being resolved.
        mac: MacAddress,
        /// Resolver failure.
        source: ResolveError,
    },
    /// The resolved identity failed sanity checks.
    #[error("{source} for MAC {mac}")]
    Target {
        /// MAC being resolved.
        mac: MacAddress,
        /// Validation failure.
        source: TargetError,
    },
    /// `status` or `start` failed.
    #[error(transparent)]
    Power(#[from] PowerError),
    /// A blocking task panicked while handling this frame.
    #[error("unexpected fault while handling packet: {0}")]
    Fault(String),
}

/// The validate → resolve → check → dispatch sequence for one frame.
pub struct Pipeline {
    resolver: Arc<DescriptorResolver>,
    dispatcher: PowerDispatcher,
    logger: Logger,
}

impl Pipeline {
    /// Assemble a pipeline.
    pub fn new(resolver: DescriptorResolver, dispatcher: PowerDispatcher, logger: Logger) -> Self {
        Self {
            resolver: Arc::new(resolver),
            dispatcher,
            logger,
        }
    }

    /// Process one frame received on `interface`.
    ///
    /// # Errors
    ///
    /// Returns a [`WakeError`] for every reason the frame did not end in a
    /// successful power-on check. None of them are fatal to the session.
    pub async fn handle_frame(
        &self,
        interface: &str,
        frame: Frame,
    ) -> Result<PowerOutcome, WakeError> {
        let mac = magic::validate_payload(frame.payload.as_deref())?;
        self.logger.info(format!(
            "Received Wake-on-LAN packet for {mac} on interface {interface} from {}",
            frame.source_description()
        ));

        let resolver = Arc::clone(&self.resolver);
        let target = tokio::task::spawn_blocking(move || resolver.resolve(&mac))
            .await
            .map_err(|e| WakeError::Fault(e.to_string()))?
            .map_err(|source| WakeError::Resolve { mac, source })?;

        let target = target
            .validate()
            .map_err(|source| WakeError::Target { mac, source })?;
        debug!(id = target.id(), kind = %target.kind(), "target validated");

        Ok(self.dispatcher.power_on(&target).await?)
    }
}

/// Owns one interface's capture and drives its frames through the pipeline.
pub struct CaptureSession {
    spec: ListenSpec,
    backend: Arc<dyn CaptureBackend>,
    pipeline: Arc<Pipeline>,
    logger: Logger,
}

impl CaptureSession {
    /// Create a session for `spec`.
    pub fn new(
        spec: ListenSpec,
        backend: Arc<dyn CaptureBackend>,
        pipeline: Arc<Pipeline>,
        logger: Logger,
    ) -> Self {
        Self {
            spec,
            backend,
            pipeline,
            logger,
        }
    }

    /// Interface this session captures on.
    pub fn interface(&self) -> &str {
        &self.spec.interface
    }

    /// Run until the capture handle fails or runs dry.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`] if the device cannot be opened, the
    /// filter cannot be installed, or reading fails. Exhausting a finite
    /// source returns `Ok(())`.
    pub async fn run(self) -> Result<(), CaptureError> {
        let interface = self.spec.interface.clone();
        let filter = build_filter(&self.spec);
        self.logger
            .info(format!("Starting capture session on interface {interface}"));

        let mut source = self.open(filter.clone()).await?;
        self.logger
            .info(format!("Installed BPF filter on {interface}: {filter}"));
        self.logger
            .info(format!("Listening for WOL packets on interface {interface}"));

        loop {
            let (returned, next) = self.read_next(source).await?;
            source = returned;
            let Some(frame) = next? else {
                return Ok(());
            };

            match self.pipeline.handle_frame(&interface, frame).await {
                Ok(outcome) => debug!(interface = %interface, ?outcome, "frame handled"),
                Err(WakeError::Payload(e)) => self.logger.warn(format!(
                    "Received invalid packet on interface {interface}: {e}"
                )),
                Err(e) => self.logger.error(format!("{e}")),
            }
        }
    }

    /// Pull one frame on the blocking pool, handing the source back.
    async fn read_next(
        &self,
        mut source: Box<dyn FrameSource>,
    ) -> Result<ReadOutcome, CaptureError> {
        tokio::task::spawn_blocking(move || {
            let next = source.next_frame();
            (source, next)
        })
        .await
        .map_err(|e| CaptureError::Fault {
            interface: self.spec.interface.clone(),
            reason: e.to_string(),
        })
    }

    /// Open the device and install the filter on the blocking pool.
    async fn open(&self, filter: String) -> Result<Box<dyn FrameSource>, CaptureError> {
        let backend = Arc::clone(&self.backend);
        let interface = self.spec.interface.clone();
        let promiscuous = self.spec.promiscuous;

        tokio::task::spawn_blocking(move || -> Result<Box<dyn FrameSource>, CaptureError> {
            let mut source = backend.open(&interface, promiscuous)?;
            source.set_filter(&filter)?;
            Ok(source)
        })
        .await
        .map_err(|e| CaptureError::Fault {
            interface: self.spec.interface.clone(),
            reason: e.to_string(),
        })?
    }
}
