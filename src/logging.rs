//! Logging setup and the message sink shared by capture sessions.
//!
//! Two layers:
//! - **Subscriber** ([`init_console`]): `tracing-subscriber` fmt output on
//!   stderr, filtered by `RUST_LOG` (default: `info`).
//! - **Sink** ([`Logger`]): the handle every component receives explicitly.
//!   [`ConsoleSink`] forwards to `tracing`; [`SyslogSink`] ships each line to
//!   a remote syslog collector over UDP and falls back to the console when
//!   sending fails.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;

use crate::config::SyslogConfig;

/// Tag placed in front of every remote syslog message.
pub const SYSLOG_TAG: &str = "wol-server";

/// Syslog facility `user` (1), pre-shifted for PRI calculation.
const FACILITY_USER: u8 = 8;

/// Initialise console logging on stderr.
///
/// Controlled by `RUST_LOG` (default: `info`).
pub fn init_console() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Severity of a sink message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Normal operation.
    Info,
    /// Recoverable problem.
    Warn,
    /// Failure of a session or a wake attempt.
    Error,
}

impl LogLevel {
    /// RFC 3164 severity number.
    pub const fn syslog_severity(self) -> u8 {
        match self {
            Self::Info => 6,
            Self::Warn => 4,
            Self::Error => 3,
        }
    }
}

/// Destination for formatted log lines.
///
/// Implementations must tolerate concurrent use from every capture session.
pub trait LogSink: Send + Sync {
    /// Emit one message.
    fn emit(&self, level: LogLevel, message: &str);
}

/// Cloneable logging handle passed into the server, sessions, and dispatcher.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Logger {
    /// Wrap an arbitrary sink.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Logger writing to the local console.
    pub fn console() -> Self {
        Self::new(Arc::new(ConsoleSink))
    }

    /// Select the sink from configuration: remote syslog when enabled,
    /// console otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if syslog is enabled and its address cannot be resolved.
    pub fn from_config(syslog: &SyslogConfig) -> anyhow::Result<Self> {
        if !syslog.enabled {
            return Ok(Self::console());
        }
        let address = syslog.socket_addr()?;
        Ok(Self::new(Arc::new(SyslogSink::new(address))))
    }

    /// Emit an informational message.
    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.emit(LogLevel::Info, message.as_ref());
    }

    /// Emit a warning.
    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink.emit(LogLevel::Warn, message.as_ref());
    }

    /// Emit an error, prefixed with `Error: `.
    pub fn error(&self, message: impl AsRef<str>) {
        self.sink
            .emit(LogLevel::Error, &format!("Error: {}", message.as_ref()));
    }
}

/// Sink that forwards to the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// Sink that sends BSD-style syslog datagrams to a remote collector.
///
/// Every message opens its own socket, so the sink holds no connection
/// state and can be shared freely between sessions.
#[derive(Debug, Clone)]
pub struct SyslogSink {
    address: SocketAddr,
    fallback: ConsoleSink,
}

impl SyslogSink {
    /// Create a sink targeting `address`.
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            fallback: ConsoleSink,
        }
    }

    /// Collector address.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    fn send(&self, datagram: &str) -> std::io::Result<()> {
        let bind: SocketAddr = if self.address.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        socket.send_to(datagram.as_bytes(), self.address)?;
        Ok(())
    }
}

impl LogSink for SyslogSink {
    fn emit(&self, level: LogLevel, message: &str) {
        let datagram = format_syslog(level, Local::now(), message);
        if let Err(e) = self.send(&datagram) {
            self.fallback.emit(
                level,
                &format!(
                    "Failed to send message to {}: {e} (message: {message})",
                    self.address
                ),
            );
        }
    }
}

/// Format one syslog line: `<PRI>YYYY-MM-DD HH:MM:SS wol-server: message`.
pub fn format_syslog(level: LogLevel, timestamp: DateTime<Local>, message: &str) -> String {
    let priority = FACILITY_USER.saturating_add(level.syslog_severity());
    format!(
        "<{priority}>{} {SYSLOG_TAG}: {message}",
        timestamp.format("%Y-%m-%d %H:%M:%S")
    )
}
