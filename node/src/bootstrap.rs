use std::fmt;
use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};

/// Which configured server answered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Primary,
    Backup,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Primary => f.write_str("primary"),
            Endpoint::Backup => f.write_str("backup"),
        }
    }
}

/// Dial the primary server, falling back to the backup once.
pub async fn connect_with_failover(config: &NodeConfig) -> NodeResult<(TcpStream, Endpoint)> {
    let connect_timeout = config.connect_timeout();

    match dial(&config.primary_addr, connect_timeout).await {
        Ok(socket) => {
            info!(addr = %config.primary_addr, "connected to primary");
            return Ok((socket, Endpoint::Primary));
        }
        Err(err) => {
            warn!(addr = %config.primary_addr, error = %err, "primary unreachable, trying backup");
        }
    }

    match dial(&config.backup_addr, connect_timeout).await {
        Ok(socket) => {
            info!(addr = %config.backup_addr, "connected to backup");
            Ok((socket, Endpoint::Backup))
        }
        Err(err) => {
            warn!(addr = %config.backup_addr, error = %err, "backup unreachable");
            Err(NodeError::Unreachable {
                primary: config.primary_addr.clone(),
                backup: config.backup_addr.clone(),
            })
        }
    }
}

async fn dial(addr: &str, connect_timeout: Duration) -> io::Result<TcpStream> {
    timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connection timeout"))?
}
