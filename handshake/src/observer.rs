//! Hooks for watching handshake outcomes

use crypto::SharedSecret;

use crate::error::HandshakeError;
use crate::types::Role;

/// Receives handshake events.
///
/// All methods default to no-ops. Implementations are shared across
/// connection tasks, so they must be `Send + Sync`. Secrets should only be
/// recorded through [`SharedSecret::fingerprint`].
pub trait HandshakeObserver: Send + Sync {
    /// The exchange fell back to classical-only. `peer_id` is the client id
    /// when known.
    fn on_downgrade(&self, _role: Role, _peer_id: Option<&str>) {}

    /// A secret was agreed.
    fn on_established(&self, _role: Role, _secret: &SharedSecret) {}

    /// The handshake failed.
    fn on_failed(&self, _role: Role, _error: &HandshakeError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl HandshakeObserver for NoopObserver {}
