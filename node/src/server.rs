use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use handshake::{HandshakeObserver, HandshakeTransport};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::NodeResult;

/// Accept connections until `shutdown` resolves, running one responder
/// handshake per connection on its own task.
pub async fn serve<F>(
    listener: TcpListener,
    config: &NodeConfig,
    observer: Arc<dyn HandshakeObserver>,
    shutdown: F,
) -> NodeResult<()>
where
    F: Future<Output = ()>,
{
    let transport = HandshakeTransport::new(config.handshake_config(observer)?);
    let welcome: Arc<str> = Arc::from(config.welcome_message.as_str());
    info!(addr = %listener.local_addr()?, scheme = %config.kem_scheme, "listening");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down listener");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, addr)) => spawn_connection(socket, addr, transport.clone(), welcome.clone()),
                Err(err) => warn!(error = %err, "accept failed"),
            },
        }
    }
}

fn spawn_connection(
    socket: TcpStream,
    addr: SocketAddr,
    transport: HandshakeTransport,
    welcome: Arc<str>,
) {
    tokio::spawn(async move {
        // handshake failures are already reported by the transport
        let established = match transport.respond(socket).await {
            Ok(established) => established,
            Err(err) => {
                debug!(peer = %addr, error = %err, "dropping connection");
                return;
            }
        };
        info!(
            peer = %addr,
            peer_id = established.peer_id().unwrap_or("-"),
            mode = %established.mode(),
            fingerprint = %established.secret().fingerprint(),
            "session key established"
        );

        let (_secret, mut stream, _) = established.into_parts();
        if let Err(err) = send_greeting(&mut stream, &welcome).await {
            warn!(peer = %addr, error = %err, "failed to deliver greeting");
        }
    });
}

/// Write the greeting line and close the write half.
async fn send_greeting<S>(stream: &mut S, welcome: &str) -> NodeResult<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(welcome.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn greeting_is_one_line_then_eof() {
        let (mut server, mut client) = tokio::io::duplex(256);
        send_greeting(&mut server, "hello there").await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "hello there\n");
    }

    #[tokio::test]
    async fn greeting_to_departed_peer_is_an_io_error() {
        let (mut server, client) = tokio::io::duplex(256);
        drop(client);

        let err = send_greeting(&mut server, "hello there").await.unwrap_err();
        assert!(matches!(err, NodeError::Io(_)));
    }
}
