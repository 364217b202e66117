//! Handshake state machines
//!
//! Both roles are pure: they turn records into messages and secrets and never
//! touch I/O. [`crate::transport::HandshakeTransport`] drives them over a
//! stream.

use crypto::{encapsulate, HybridKeyPair, KeyExchangeMode, SharedSecret};

use crate::codec::decode_record;
use crate::config::HandshakeConfig;
use crate::error::{HandshakeError, ProtocolError, Result};
use crate::types::{ClientHello, Role, ServerHello};

/// Initiator progress
#[derive(Debug)]
pub enum InitiatorState {
    Start,
    SentHello,
    AwaitingServerHello,
    Derived(SharedSecret),
    Failed,
}

impl InitiatorState {
    pub fn name(&self) -> &'static str {
        match self {
            InitiatorState::Start => "Start",
            InitiatorState::SentHello => "SentHello",
            InitiatorState::AwaitingServerHello => "AwaitingServerHello",
            InitiatorState::Derived(_) => "Derived",
            InitiatorState::Failed => "Failed",
        }
    }
}

/// Client side of the exchange
pub struct Initiator<'a> {
    config: &'a HandshakeConfig,
    keypair: &'a HybridKeyPair,
    state: InitiatorState,
    offered_pq: bool,
}

impl<'a> Initiator<'a> {
    pub fn new(config: &'a HandshakeConfig, keypair: &'a HybridKeyPair) -> Self {
        Self {
            config,
            keypair,
            state: InitiatorState::Start,
            offered_pq: false,
        }
    }

    pub fn state(&self) -> &InitiatorState {
        &self.state
    }

    /// Build the ClientHello. The PQ key is offered only when the key pair
    /// has one and the configuration allows it.
    pub fn start(&mut self) -> Result<ClientHello> {
        self.expect(matches!(self.state, InitiatorState::Start), "start")?;

        let hello = ClientHello::from_keypair(
            self.config.client_id.as_str(),
            self.keypair,
            self.config.offer_pq,
        );
        self.offered_pq = hello.offers_pq();

        if self.config.require_pq && !self.offered_pq {
            return Err(self.fail(ProtocolError::DowngradeRejected.into()));
        }

        if self.config.verbose_logging {
            tracing::debug!(
                client_id = %hello.id,
                pq_alg = hello.pq_algorithm.as_deref().unwrap_or("none"),
                "Generated ClientHello"
            );
        }

        self.state = InitiatorState::SentHello;
        Ok(hello)
    }

    /// Record that the ClientHello reached the stream.
    pub fn hello_sent(&mut self) -> Result<()> {
        self.expect(matches!(self.state, InitiatorState::SentHello), "hello_sent")?;
        self.state = InitiatorState::AwaitingServerHello;
        Ok(())
    }

    /// Process the ServerHello record and derive the shared secret.
    pub fn receive(&mut self, record: &str) -> Result<KeyExchangeMode> {
        self.expect(
            matches!(self.state, InitiatorState::AwaitingServerHello),
            "receive",
        )?;

        match self.process_server_hello(record) {
            Ok(secret) => {
                let mode = secret.mode();
                self.state = InitiatorState::Derived(secret);
                Ok(mode)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Hand the derived secret to the caller.
    pub fn into_secret(mut self) -> Result<SharedSecret> {
        match std::mem::replace(&mut self.state, InitiatorState::Failed) {
            InitiatorState::Derived(secret) => Ok(secret),
            other => Err(ProtocolError::InvalidState {
                state: other.name(),
                operation: "into_secret",
            }
            .into()),
        }
    }

    /// Move to Failed, wiping any derived secret.
    pub fn abort(&mut self) {
        self.state = InitiatorState::Failed;
    }

    fn process_server_hello(&self, record: &str) -> Result<SharedSecret> {
        let hello: ServerHello = decode_record(record)?;

        match (self.offered_pq, hello.has_ciphertext()) {
            (false, true) => return Err(ProtocolError::UnexpectedCiphertext.into()),
            (true, false) => {
                if self.config.require_pq {
                    return Err(ProtocolError::DowngradeRejected.into());
                }
                tracing::warn!("responder sent no KEM ciphertext; continuing classical-only");
                self.config.observer.on_downgrade(Role::Initiator, None);
            }
            _ => {}
        }

        let secret = self.keypair.decapsulate(
            &hello.classical_ephemeral_public,
            hello.pq_ciphertext.as_deref(),
        )?;

        if self.config.verbose_logging {
            tracing::debug!(mode = %secret.mode(), "Processed ServerHello");
        }

        Ok(secret)
    }

    fn expect(&mut self, valid: bool, operation: &'static str) -> Result<()> {
        if valid {
            return Ok(());
        }
        let state = self.state.name();
        Err(self.fail(ProtocolError::InvalidState { state, operation }.into()))
    }

    fn fail(&mut self, error: HandshakeError) -> HandshakeError {
        self.abort();
        error
    }
}

/// Responder progress
#[derive(Debug)]
pub enum ResponderState {
    Start,
    AwaitingClientHello,
    Encapsulated(ResponderOutcome),
    Failed,
}

impl ResponderState {
    pub fn name(&self) -> &'static str {
        match self {
            ResponderState::Start => "Start",
            ResponderState::AwaitingClientHello => "AwaitingClientHello",
            ResponderState::Encapsulated(_) => "Encapsulated",
            ResponderState::Failed => "Failed",
        }
    }
}

/// What the responder learns from a completed exchange
#[derive(Debug)]
pub struct ResponderOutcome {
    pub peer_id: String,
    pub secret: SharedSecret,
}

/// Server side of the exchange
pub struct Responder<'a> {
    config: &'a HandshakeConfig,
    state: ResponderState,
}

impl<'a> Responder<'a> {
    pub fn new(config: &'a HandshakeConfig) -> Self {
        Self {
            config,
            state: ResponderState::Start,
        }
    }

    pub fn state(&self) -> &ResponderState {
        &self.state
    }

    pub fn begin(&mut self) -> Result<()> {
        self.expect(matches!(self.state, ResponderState::Start), "begin")?;
        self.state = ResponderState::AwaitingClientHello;
        Ok(())
    }

    /// Process a ClientHello record and produce the ServerHello reply.
    pub fn receive(&mut self, record: &str) -> Result<ServerHello> {
        self.expect(
            matches!(self.state, ResponderState::AwaitingClientHello),
            "receive",
        )?;

        match self.process_client_hello(record) {
            Ok((reply, outcome)) => {
                self.state = ResponderState::Encapsulated(outcome);
                Ok(reply)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn into_outcome(mut self) -> Result<ResponderOutcome> {
        match std::mem::replace(&mut self.state, ResponderState::Failed) {
            ResponderState::Encapsulated(outcome) => Ok(outcome),
            other => Err(ProtocolError::InvalidState {
                state: other.name(),
                operation: "into_outcome",
            }
            .into()),
        }
    }

    pub fn abort(&mut self) {
        self.state = ResponderState::Failed;
    }

    fn process_client_hello(&self, record: &str) -> Result<(ServerHello, ResponderOutcome)> {
        let hello: ClientHello = decode_record(record)?;
        let peer_pq = hello.peer_pq_key(&self.config.kem_scheme);

        if peer_pq.is_none() {
            if self.config.require_pq {
                return Err(ProtocolError::DowngradeRejected.into());
            }
            tracing::warn!(
                peer_id = %hello.id,
                "client offered no post-quantum key; continuing classical-only"
            );
            self.config
                .observer
                .on_downgrade(Role::Responder, Some(hello.id.as_str()));
        }

        let encap = encapsulate(&hello.classical_public, peer_pq)?;

        if self.config.verbose_logging {
            tracing::debug!(
                peer_id = %hello.id,
                mode = %encap.mode(),
                "Generated ServerHello"
            );
        }

        let reply = ServerHello {
            classical_ephemeral_public: encap.ephemeral_public,
            pq_ciphertext: encap.ciphertext,
        };
        let outcome = ResponderOutcome {
            peer_id: hello.id,
            secret: encap.shared_secret,
        };
        Ok((reply, outcome))
    }

    fn expect(&mut self, valid: bool, operation: &'static str) -> Result<()> {
        if valid {
            return Ok(());
        }
        let state = self.state.name();
        Err(self.fail(ProtocolError::InvalidState { state, operation }.into()))
    }

    fn fail(&mut self, error: HandshakeError) -> HandshakeError {
        self.abort();
        error
    }
}
