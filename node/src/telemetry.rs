use std::sync::atomic::{AtomicU64, Ordering};

use crypto::{KeyExchangeMode, SharedSecret};
use handshake::{HandshakeError, HandshakeObserver, Role};
use parking_lot::RwLock;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    pub hybrid_sessions: u64,
    pub classical_sessions: u64,
    pub downgrades: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fingerprint: Option<String>,
}

/// Handshake counters shared by all connection tasks.
///
/// Only the fingerprint of the most recent secret is kept.
#[derive(Debug, Default)]
pub struct HandshakeTelemetry {
    hybrid_sessions: AtomicU64,
    classical_sessions: AtomicU64,
    downgrades: AtomicU64,
    failures: AtomicU64,
    last_fingerprint: RwLock<Option<String>>,
}

impl HandshakeTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            hybrid_sessions: self.hybrid_sessions.load(Ordering::Relaxed),
            classical_sessions: self.classical_sessions.load(Ordering::Relaxed),
            downgrades: self.downgrades.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_fingerprint: self.last_fingerprint.read().clone(),
        }
    }
}

impl HandshakeObserver for HandshakeTelemetry {
    fn on_downgrade(&self, _role: Role, _peer_id: Option<&str>) {
        self.downgrades.fetch_add(1, Ordering::Relaxed);
    }

    fn on_established(&self, _role: Role, secret: &SharedSecret) {
        let counter = match secret.mode() {
            KeyExchangeMode::Hybrid => &self.hybrid_sessions,
            KeyExchangeMode::ClassicalOnly => &self.classical_sessions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        *self.last_fingerprint.write() = Some(secret.fingerprint());
    }

    fn on_failed(&self, _role: Role, _error: &HandshakeError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}
