//! Shared fakes and fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use etherparse::PacketBuilder;

use wolpve::capture::{CaptureBackend, CaptureError, Frame, FrameSource};
use wolpve::config::ListenSpec;
use wolpve::executor::{CommandError, CommandOutput, CommandRunner};
use wolpve::logging::{LogLevel, LogSink, Logger};

// ── Logging ──

/// Sink that keeps every emitted line in memory.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, line)| line).collect()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl LogSink for RecordingSink {
    fn emit(&self, level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_owned()));
        }
    }
}

pub fn recording_logger() -> (Logger, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (Logger::new(sink.clone()), sink)
}

// ── Commands ──

/// Command runner returning canned `status`/`start` results.
///
/// `None` for either response simulates a spawn failure.
pub struct FakeRunner {
    status: Option<CommandOutput>,
    start: Option<CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new(status: Option<CommandOutput>, start: Option<CommandOutput>) -> Self {
        Self {
            status,
            start,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Workload reported as stopped; start succeeds.
    pub fn stopped() -> Self {
        Self::new(Some(ok_output("status: stopped")), Some(ok_output("")))
    }

    /// Workload reported as running.
    pub fn running() -> Self {
        Self::new(Some(ok_output("status: running")), Some(ok_output("")))
    }

    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait::async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let mut line = program.to_owned();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line);
        }

        let response = match args.first() {
            Some(&"status") => self.status.clone(),
            Some(&"start") => self.start.clone(),
            _ => None,
        };
        response.ok_or_else(|| CommandError::Spawn {
            program: program.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
        })
    }
}

pub fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        stdout: stdout.to_owned(),
        stderr: String::new(),
    }
}

pub fn failed_output(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_owned(),
    }
}

// ── Capture ──

/// Behaviour of one scripted interface.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub frames: Vec<Frame>,
    pub fail_open: bool,
    pub fail_filter: bool,
    pub fail_read_at_end: bool,
    pub delay: Duration,
}

impl Script {
    pub fn frames(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }
}

/// Capture backend that replays scripted frames per interface.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    filters: Arc<Mutex<Vec<(String, String)>>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn with(mut self, interface: &str, script: Script) -> Self {
        self.scripts.insert(interface.to_owned(), script);
        self
    }

    /// `(interface, filter)` pairs in installation order.
    pub fn installed_filters(&self) -> Vec<(String, String)> {
        match self.filters.lock() {
            Ok(filters) => filters.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Shared count of `next_frame` calls across every opened source.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl CaptureBackend for ScriptedBackend {
    fn open(
        &self,
        interface: &str,
        _promiscuous: bool,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        let script = match self.scripts.get(interface) {
            Some(script) if !script.fail_open => script.clone(),
            _ => {
                return Err(CaptureError::Open {
                    interface: interface.to_owned(),
                    reason: "No such device exists".to_owned(),
                })
            }
        };
        Ok(Box::new(ScriptedSource {
            interface: interface.to_owned(),
            frames: script.frames.iter().cloned().collect(),
            script,
            filters: Arc::clone(&self.filters),
            reads: Arc::clone(&self.reads),
        }))
    }
}

struct ScriptedSource {
    interface: String,
    frames: VecDeque<Frame>,
    script: Script,
    filters: Arc<Mutex<Vec<(String, String)>>>,
    reads: Arc<AtomicUsize>,
}

impl FrameSource for ScriptedSource {
    fn set_filter(&mut self, filter: &str) -> Result<(), CaptureError> {
        if self.script.fail_filter {
            return Err(CaptureError::Filter {
                filter: filter.to_owned(),
                reason: "syntax error".to_owned(),
            });
        }
        if let Ok(mut filters) = self.filters.lock() {
            filters.push((self.interface.clone(), filter.to_owned()));
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.script.delay.is_zero() {
            std::thread::sleep(self.script.delay);
        }
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.script.fail_read_at_end => Err(CaptureError::Read {
                interface: self.interface.clone(),
                reason: "The interface went down".to_owned(),
            }),
            None => Ok(None),
        }
    }
}

// ── Fixtures ──

pub const WEB01_MAC: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];

/// Six `0xFF` bytes followed by sixteen copies of `mac`.
pub fn magic_payload(mac: [u8; 6]) -> Vec<u8> {
    let mut payload = vec![0xff; 6];
    for _ in 0..16 {
        payload.extend_from_slice(&mac);
    }
    payload
}

/// Broadcast Ethernet/IPv4/UDP frame to port 9 carrying `payload`.
pub fn udp_frame_bytes(payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0x00, 0x50, 0x56, 0x11, 0x22, 0x33], [0xff; 6])
        .ipv4([192, 168, 1, 10], [192, 168, 1, 255], 64)
        .udp(40000, 9);
    let mut bytes = Vec::with_capacity(builder.size(payload.len()));
    builder
        .write(&mut bytes, payload)
        .expect("writing to a Vec cannot fail");
    bytes
}

/// Decoded magic-packet frame for `mac`.
pub fn wol_frame(mac: [u8; 6]) -> Frame {
    Frame::from_ethernet(&udp_frame_bytes(&magic_payload(mac)))
}

pub fn listen_spec(interface: &str) -> ListenSpec {
    ListenSpec {
        interface: interface.to_owned(),
        promiscuous: false,
        src_macs: vec!["00:50:56:11:22:33".to_owned()],
        src_ips: vec!["192.168.1.10".to_owned()],
        dst_ips: vec!["192.168.1.255".to_owned()],
        dst_macs: vec!["ff:ff:ff:ff:ff:ff".to_owned()],
        dst_port: 9,
    }
}

pub fn write_descriptor(dir: &Path, file_name: &str, contents: &str) {
    std::fs::create_dir_all(dir).expect("should create descriptor dir");
    std::fs::write(dir.join(file_name), contents).expect("should write descriptor");
}

/// Temp tree with `qemu-server/100.conf` (web01) and `lxc/200.conf` (cache01).
pub fn descriptor_tree() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    write_descriptor(
        &tmp.path().join("qemu-server"),
        "100.conf",
        "boot: order=scsi0\nmemory: 2048\nname: web01\nnet0: virtio=AA:BB:CC:DD:EE:FF,bridge=vmbr0\n",
    );
    write_descriptor(
        &tmp.path().join("lxc"),
        "200.conf",
        "arch: amd64\nhostname: cache01\nnet0: name=eth0,bridge=vmbr0,hwaddr=12:34:56:78:9a:bc,type=veth\n",
    );
    tmp
}
