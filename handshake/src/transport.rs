//! Drives the handshake state machines over an async byte stream

use bytes::BytesMut;
use crypto::{HybridKeyPair, KeyExchangeMode, SharedSecret};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::{Framed, FramedParts};

use crate::codec::HelloCodec;
use crate::config::HandshakeConfig;
use crate::error::{HandshakeError, Result};
use crate::handshake::{Initiator, Responder};
use crate::types::Role;

/// A completed handshake and the stream it ran on
pub struct Established<S> {
    role: Role,
    secret: SharedSecret,
    peer_id: Option<String>,
    stream: S,
    read_buf: BytesMut,
}

impl<S> Established<S> {
    fn from_parts(
        role: Role,
        secret: SharedSecret,
        peer_id: Option<String>,
        parts: FramedParts<S, HelloCodec>,
    ) -> Self {
        Self {
            role,
            secret,
            peer_id,
            stream: parts.io,
            read_buf: parts.read_buf,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    pub fn mode(&self) -> KeyExchangeMode {
        self.secret.mode()
    }

    /// Client id presented in the ClientHello (responder side only)
    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    /// Bytes the peer sent after its handshake record
    pub fn buffered(&self) -> &[u8] {
        &self.read_buf
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_secret(self) -> SharedSecret {
        self.secret
    }

    /// Split into the secret, the stream and any bytes already read past the
    /// handshake.
    pub fn into_parts(self) -> (SharedSecret, S, BytesMut) {
        (self.secret, self.stream, self.read_buf)
    }
}

/// Runs hybrid handshakes over any `AsyncRead + AsyncWrite` stream
#[derive(Clone, Debug)]
pub struct HandshakeTransport {
    config: HandshakeConfig,
}

impl HandshakeTransport {
    pub fn new(config: HandshakeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Run the handshake as initiator using `keypair` as identity
    pub async fn initiate<S>(&self, keypair: &HybridKeyPair, socket: S) -> Result<Established<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let handshake_timeout = self.config.handshake_timeout;
        let result = timeout(handshake_timeout, self.do_initiator_handshake(keypair, socket))
            .await
            .unwrap_or(Err(HandshakeError::Timeout));
        self.report(Role::Initiator, result)
    }

    /// Run the handshake as responder
    pub async fn respond<S>(&self, socket: S) -> Result<Established<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let handshake_timeout = self.config.handshake_timeout;
        let result = timeout(handshake_timeout, self.do_responder_handshake(socket))
            .await
            .unwrap_or(Err(HandshakeError::Timeout));
        self.report(Role::Responder, result)
    }

    async fn do_initiator_handshake<S>(
        &self,
        keypair: &HybridKeyPair,
        socket: S,
    ) -> Result<Established<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(
            socket,
            HelloCodec::new(self.config.max_handshake_message_size),
        );
        let mut initiator = Initiator::new(&self.config, keypair);

        if let Err(e) = self.drive_initiator(&mut initiator, &mut framed).await {
            initiator.abort();
            return Err(e);
        }

        let secret = initiator.into_secret()?;
        Ok(Established::from_parts(
            Role::Initiator,
            secret,
            None,
            framed.into_parts(),
        ))
    }

    async fn drive_initiator<S>(
        &self,
        initiator: &mut Initiator<'_>,
        framed: &mut Framed<S, HelloCodec>,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Step 1: Send ClientHello
        let hello = initiator.start()?;
        framed.send(&hello).await?;
        initiator.hello_sent()?;

        if self.config.verbose_logging {
            tracing::debug!("Sent ClientHello");
        }

        // Step 2: Receive ServerHello and derive
        let record = framed
            .next()
            .await
            .ok_or(HandshakeError::ConnectionClosed)??;

        if self.config.verbose_logging {
            tracing::debug!(len = record.len(), "Received ServerHello");
        }

        initiator.receive(&record)?;
        Ok(())
    }

    async fn do_responder_handshake<S>(&self, socket: S) -> Result<Established<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(
            socket,
            HelloCodec::new(self.config.max_handshake_message_size),
        );
        let mut responder = Responder::new(&self.config);

        if let Err(e) = self.drive_responder(&mut responder, &mut framed).await {
            responder.abort();
            return Err(e);
        }

        let outcome = responder.into_outcome()?;
        Ok(Established::from_parts(
            Role::Responder,
            outcome.secret,
            Some(outcome.peer_id),
            framed.into_parts(),
        ))
    }

    async fn drive_responder<S>(
        &self,
        responder: &mut Responder<'_>,
        framed: &mut Framed<S, HelloCodec>,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        responder.begin()?;

        // Step 1: Receive ClientHello
        let record = framed
            .next()
            .await
            .ok_or(HandshakeError::ConnectionClosed)??;

        if self.config.verbose_logging {
            tracing::debug!(len = record.len(), "Received ClientHello");
        }

        // Step 2: Encapsulate and reply
        let reply = responder.receive(&record)?;
        framed.send(&reply).await?;

        if self.config.verbose_logging {
            tracing::debug!("Sent ServerHello");
        }

        Ok(())
    }

    fn report<S>(&self, role: Role, result: Result<Established<S>>) -> Result<Established<S>> {
        match &result {
            Ok(established) => {
                tracing::info!(
                    role = %role,
                    mode = %established.mode(),
                    peer_id = established.peer_id().unwrap_or("-"),
                    fingerprint = %established.secret().fingerprint(),
                    "Hybrid handshake complete"
                );
                self.config.observer.on_established(role, established.secret());
            }
            Err(e) => {
                tracing::warn!(role = %role, error = %e, "Handshake failed");
                self.config.observer.on_failed(role, e);
            }
        }
        result
    }
}
