//! Tests for `src/logging.rs`.

use std::net::UdpSocket;
use std::time::Duration;

use chrono::{Local, TimeZone};

use wolpve::config::SyslogConfig;
use wolpve::logging::{format_syslog, LogLevel, LogSink, Logger, SyslogSink};

use crate::support::recording_logger;

#[test]
fn logger_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Logger>();
}

#[test]
fn error_lines_are_prefixed() {
    let (logger, sink) = recording_logger();
    logger.info("Listening for WOL packets on interface eth0");
    logger.error("failed to open capture device eth9");

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, LogLevel::Info);
    assert_eq!(entries[1].0, LogLevel::Error);
    assert_eq!(entries[1].1, "Error: failed to open capture device eth9");
}

#[test]
fn syslog_line_format() {
    let timestamp = Local
        .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
        .single()
        .expect("timestamp should be unambiguous");
    assert_eq!(
        format_syslog(LogLevel::Info, timestamp, "Powered on VM 100 - web01"),
        "<14>2024-03-09 07:05:01 wol-server: Powered on VM 100 - web01"
    );
    assert!(format_syslog(LogLevel::Error, timestamp, "x").starts_with("<11>"));
}

#[test]
fn syslog_sink_sends_one_datagram_per_message() {
    let collector = UdpSocket::bind("127.0.0.1:0").expect("should bind collector");
    collector
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("should set timeout");
    let address = collector.local_addr().expect("should have address");

    let sink = SyslogSink::new(address);
    sink.emit(LogLevel::Info, "first");
    sink.emit(LogLevel::Warn, "second");

    let mut buf = [0u8; 512];
    let (len, _) = collector.recv_from(&mut buf).expect("should receive first");
    let first = String::from_utf8_lossy(&buf[..len]).into_owned();
    assert!(first.starts_with("<14>"));
    assert!(first.ends_with("wol-server: first"));

    let (len, _) = collector.recv_from(&mut buf).expect("should receive second");
    let second = String::from_utf8_lossy(&buf[..len]).into_owned();
    assert!(second.starts_with("<12>"));
    assert!(second.ends_with("wol-server: second"));
}

#[test]
fn from_config_selects_sink() {
    let disabled = SyslogConfig::default();
    assert!(Logger::from_config(&disabled).is_ok());

    let enabled = SyslogConfig {
        enabled: true,
        address: "127.0.0.1".to_owned(),
        port: 5514,
    };
    assert!(Logger::from_config(&enabled).is_ok());

    let broken = SyslogConfig {
        enabled: true,
        address: "not a host name".to_owned(),
        port: 514,
    };
    assert!(Logger::from_config(&broken).is_err());
}
