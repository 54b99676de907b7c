//! UDP miner telemetry capture
//!
//! A passive diagnostic that:
//! - Listens for miner status broadcasts on UDP port 12345
//! - Prints every datagram raw, plus the parsed document when it is JSON
//! - Tracks the latest document per miner IP
//! - Prints a per-miner field analysis when interrupted

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token};

mod decode;
mod registry;
mod report;
mod stats;
mod units;

use registry::MinerRegistry;
use stats::CaptureStats;

// ============================================================================
// Constants
// ============================================================================

/// UDP port the miners broadcast on
const LISTEN_PORT: u16 = 12345;

/// Receive buffer size; miner payloads are well under this
const MAX_DATAGRAM_SIZE: usize = 4096;

/// mio token for the UDP socket
const SOCKET_TOKEN: Token = Token(0);

/// Poll timeout, so a pending shutdown signal is noticed between datagrams
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    // Shutdown flag, set by SIGINT/SIGTERM
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    log::info!("UDP miner capture starting...");
    log::info!("  Port: {}", LISTEN_PORT);
    log::info!("  Stop: Ctrl-C prints the final analysis");

    let mut capture = Capture::new(LISTEN_PORT)?;
    capture.run(&shutdown)
}

// ============================================================================
// Capture Structure
// ============================================================================

struct Capture {
    /// mio poll instance
    poll: Poll,
    /// UDP socket
    socket: UdpSocket,
    /// Latest document per miner IP
    registry: MinerRegistry,
    /// Session counters
    stats: CaptureStats,
    /// Receive buffer
    recv_buf: Vec<u8>,
}

impl Capture {
    fn new(port: u16) -> Result<Self, Box<dyn std::error::Error>> {
        let poll = Poll::new()?;
        let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
        let mut socket = UdpSocket::bind(addr)?;

        poll.registry()
            .register(&mut socket, SOCKET_TOKEN, Interest::READABLE)?;

        log::info!("Listening for UDP packets on {}", addr);

        Ok(Capture {
            poll,
            socket,
            registry: MinerRegistry::new(),
            stats: CaptureStats::new(),
            recv_buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    fn run(&mut self, shutdown: &AtomicBool) -> Result<(), Box<dyn std::error::Error>> {
        let mut events = Events::with_capacity(16);

        while !shutdown.load(Ordering::Relaxed) {
            if let Err(e) = self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                // poll returns EINTR when the signal lands mid-wait
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in events.iter() {
                if event.token() == SOCKET_TOKEN {
                    self.drain_socket();
                }
            }
        }

        log::info!("Capture stopped, {} miner(s) seen", self.registry.count());

        let stdout = io::stdout();
        let mut out = stdout.lock();
        report::write_final(&mut out, &self.registry, &self.stats)?;
        out.flush()?;

        Ok(())
    }

    /// Read datagrams until the socket would block
    fn drain_socket(&mut self) {
        // Copy to a working buffer to avoid borrow conflicts with self.recv_buf
        let mut payload = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (len, from) = match self.socket.recv_from(&mut self.recv_buf) {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("recv error: {}", e);
                    self.stats.recv_errors += 1;
                    break;
                }
            };

            payload[..len].copy_from_slice(&self.recv_buf[..len]);

            if let Err(e) = self.handle_datagram(&payload[..len], from) {
                // One bad datagram never stops the capture
                log::error!("failed to report datagram from {}: {}", from, e);
            }
        }
    }

    /// Decode one datagram, fold it into the registry, print the block
    fn handle_datagram(&mut self, payload: &[u8], from: SocketAddr) -> io::Result<()> {
        let seen_at = Local::now();
        self.stats.datagrams += 1;
        self.stats.bytes += payload.len() as u64;

        let obs = decode::decode(payload);

        match &obs.doc {
            Ok(doc) => self.registry.record(from.ip(), doc.clone(), seen_at),
            Err(err) => {
                log::debug!("payload from {} not parseable: {}", from, err);
                self.stats.parse_failures += 1;
            }
        }

        let stdout = io::stdout();
        let mut out = stdout.lock();
        report::write_observation(&mut out, seen_at, from, &obs, &self.registry)?;
        out.flush()
    }
}
