// OSC ingestion
//
// Datagrams are handled strictly one at a time in arrival order. Each valid
// message becomes a frame that is fanned out to every subscriber queue. With
// no subscriber around, the packet is instead used to ask the show service
// to switch the worker over to us; frames arriving before the worker
// connects are lost.

use super::notifier::TakeoverNotifier;
use super::registry::{EncodedFrame, SubscriberRegistry};
use super::validate::{frame_from_message, messages};
use crate::frame::Frame;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Largest UDP payload
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Byte layout of frames on the broadcast stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastFormat {
    /// Renderer representation, what the worker expects from any renderer
    #[default]
    Raw,
    /// Panel wire format
    Wire,
}

impl BroadcastFormat {
    pub fn serialize(&self, frame: &Frame) -> Vec<u8> {
        match self {
            BroadcastFormat::Raw => frame.as_raw().to_vec(),
            BroadcastFormat::Wire => frame.encode(),
        }
    }
}

impl FromStr for BroadcastFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(BroadcastFormat::Raw),
            "wire" => Ok(BroadcastFormat::Wire),
            other => Err(format!("unknown broadcast format: {} (expected raw or wire)", other)),
        }
    }
}

/// Running totals for the health endpoint
#[derive(Debug, Default)]
pub struct IngestStats {
    packets_received: AtomicU64,
    packets_malformed: AtomicU64,
    frames_accepted: AtomicU64,
    frames_rejected: AtomicU64,
    frames_broadcast: AtomicU64,
    escalations: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSnapshot {
    pub packets_received: u64,
    pub packets_malformed: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub frames_broadcast: u64,
    pub escalations: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_malformed: self.packets_malformed.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
        }
    }

    fn record(&self, report: &DatagramReport) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        if report.malformed {
            self.packets_malformed.fetch_add(1, Ordering::Relaxed);
        }
        self.frames_accepted.fetch_add(report.accepted as u64, Ordering::Relaxed);
        self.frames_rejected.fetch_add(report.rejected as u64, Ordering::Relaxed);
        self.frames_broadcast.fetch_add(report.broadcast as u64, Ordering::Relaxed);
        if report.escalated {
            self.escalations.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// What happened to one datagram
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatagramReport {
    /// The bytes were not an OSC packet
    pub malformed: bool,
    /// Messages that made a valid frame
    pub accepted: usize,
    /// Messages dropped by validation
    pub rejected: usize,
    /// Frames pushed to subscribers
    pub broadcast: usize,
    /// Individual queue deliveries
    pub deliveries: usize,
    /// The show service was asked for the display
    pub escalated: bool,
}

pub struct OscIngest {
    registry: SubscriberRegistry,
    notifier: Arc<dyn TakeoverNotifier>,
    format: BroadcastFormat,
    stats: Arc<IngestStats>,
}

impl OscIngest {
    pub fn new(
        registry: SubscriberRegistry,
        notifier: Arc<dyn TakeoverNotifier>,
        format: BroadcastFormat,
    ) -> Self {
        Self {
            registry,
            notifier,
            format,
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    /// Process one datagram
    pub fn handle_datagram(&self, data: &[u8]) -> DatagramReport {
        let mut report = DatagramReport::default();

        let packet = match rosc::decoder::decode_udp(data) {
            Ok((_, packet)) => packet,
            Err(e) => {
                warn!("Dropping malformed OSC packet ({} bytes): {:?}", data.len(), e);
                report.malformed = true;
                self.stats.record(&report);
                return report;
            }
        };

        for message in messages(packet) {
            let frame = match frame_from_message(&message) {
                Ok(frame) => frame,
                Err(rejection) => {
                    warn!(addr = %message.addr, "Rejected OSC message: {}", rejection);
                    report.rejected += 1;
                    continue;
                }
            };
            report.accepted += 1;

            if self.registry.is_empty() {
                if !report.escalated {
                    info!("No subscribers, asking the show service for the display");
                    self.notifier.request_display();
                    report.escalated = true;
                }
                continue;
            }

            let encoded: EncodedFrame = STANDARD.encode(self.format.serialize(&frame)).into();
            report.deliveries += self.registry.broadcast(encoded);
            report.broadcast += 1;
        }

        self.stats.record(&report);
        report
    }

    /// Receive datagrams until the task is dropped
    pub async fn run(self: Arc<Self>, socket: UdpSocket) {
        match socket.local_addr() {
            Ok(addr) => info!("OSC listening on udp://{}", addr),
            Err(e) => warn!("OSC socket has no local address: {}", e),
        }

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    let report = self.handle_datagram(&buf[..len]);
                    debug!(%peer, ?report, "OSC datagram handled");
                }
                Err(e) => error!("OSC receive failed: {}", e),
            }
        }
    }
}
