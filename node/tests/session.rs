use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Duration;

use crypto::KeyExchangeMode;
use handshake::{HandshakeConfig, HandshakeError, HandshakeTransport, NoopObserver};
use mirage_node::bootstrap::Endpoint;
use mirage_node::{client, server, HandshakeTelemetry, NodeConfig, NodeError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

fn unused_addr() -> SocketAddr {
    StdTcpListener::bind("127.0.0.1:0")
        .expect("bind temp socket")
        .local_addr()
        .expect("local addr")
}

struct TestServer {
    addr: SocketAddr,
    telemetry: Arc<HandshakeTelemetry>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start(config: NodeConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let telemetry = Arc::new(HandshakeTelemetry::new());
        let (shutdown, rx) = oneshot::channel();

        let observer = telemetry.clone();
        let task = tokio::spawn(async move {
            server::serve(listener, &config, observer, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        Self {
            addr,
            telemetry,
            shutdown,
            task,
        }
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.task.await.unwrap();
    }
}

fn client_config(primary: SocketAddr, backup: SocketAddr) -> NodeConfig {
    NodeConfig {
        primary_addr: primary.to_string(),
        backup_addr: backup.to_string(),
        connect_timeout_ms: 500,
        handshake_timeout_ms: 5_000,
        ..NodeConfig::default()
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hybrid_session_with_primary() {
    let server = TestServer::start(NodeConfig::default()).await;

    let config = client_config(server.addr, unused_addr());
    let report = client::run(&config, Arc::new(NoopObserver)).await.unwrap();

    assert_eq!(report.endpoint, Endpoint::Primary);
    assert_eq!(report.mode(), KeyExchangeMode::Hybrid);
    assert_eq!(report.welcome, "Welcome to the Quantum Fortress!");

    let stats = server.telemetry.snapshot();
    assert_eq!(stats.hybrid_sessions, 1);
    assert_eq!(stats.downgrades, 0);
    assert_eq!(stats.last_fingerprint, Some(report.secret.fingerprint()));

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn falls_back_to_backup() {
    let server = TestServer::start(NodeConfig::default()).await;

    let config = client_config(unused_addr(), server.addr);
    let report = client::run(&config, Arc::new(NoopObserver)).await.unwrap();

    assert_eq!(report.endpoint, Endpoint::Backup);
    assert_eq!(report.mode(), KeyExchangeMode::Hybrid);

    server.stop().await;
}

#[tokio::test]
async fn both_endpoints_down_is_unreachable() {
    let config = client_config(unused_addr(), unused_addr());
    let err = client::run(&config, Arc::new(NoopObserver)).await.unwrap_err();
    assert!(matches!(err, NodeError::Unreachable { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn classical_client_is_downgraded() {
    let server = TestServer::start(NodeConfig::default()).await;

    let config = NodeConfig {
        offer_pq: false,
        ..client_config(server.addr, unused_addr())
    };
    let report = client::run(&config, Arc::new(NoopObserver)).await.unwrap();

    assert_eq!(report.mode(), KeyExchangeMode::ClassicalOnly);
    assert_eq!(report.secret.len(), 32);

    let stats = server.telemetry.snapshot();
    assert_eq!(stats.classical_sessions, 1);
    assert_eq!(stats.downgrades, 1);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn strict_server_refuses_classical_client() {
    let server = TestServer::start(NodeConfig {
        require_pq: true,
        ..NodeConfig::default()
    })
    .await;

    let config = NodeConfig {
        offer_pq: false,
        ..client_config(server.addr, unused_addr())
    };
    let err = client::run(&config, Arc::new(NoopObserver)).await.unwrap_err();
    assert!(matches!(
        err,
        NodeError::Handshake(HandshakeError::ConnectionClosed)
    ));

    let telemetry = server.telemetry.clone();
    wait_until(|| telemetry.snapshot().failures == 1).await;
    assert_eq!(telemetry.snapshot().hybrid_sessions, 0);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_clients_get_distinct_secrets() {
    let server = TestServer::start(NodeConfig::default()).await;
    let config = client_config(server.addr, unused_addr());

    let sessions: Vec<_> = (0..4)
        .map(|i| {
            let config = NodeConfig {
                client_id: format!("client-{i}"),
                ..config.clone()
            };
            tokio::spawn(async move { client::run(&config, Arc::new(NoopObserver)).await })
        })
        .collect();

    let mut fingerprints = Vec::new();
    for session in sessions {
        let report = session.await.unwrap().unwrap();
        fingerprints.push(report.secret.fingerprint());
    }
    fingerprints.sort();
    fingerprints.dedup();
    assert_eq!(fingerprints.len(), 4);
    assert_eq!(server.telemetry.snapshot().hybrid_sessions, 4);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn silent_server_times_out_waiting_for_greeting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (release, held) = oneshot::channel::<()>();

    // completes the handshake, then never writes the greeting
    let silent = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let transport = HandshakeTransport::new(HandshakeConfig::development("silent-server"));
        let established = transport.respond(socket).await.unwrap();
        let _ = held.await;
        drop(established);
    });

    let config = NodeConfig {
        handshake_timeout_ms: 300,
        ..client_config(addr, unused_addr())
    };
    let err = timeout(
        Duration::from_secs(5),
        client::run(&config, Arc::new(NoopObserver)),
    )
    .await
    .expect("client must not hang")
    .unwrap_err();
    assert!(matches!(err, NodeError::GreetingTimeout(d) if d == Duration::from_millis(300)));

    let _ = release.send(());
    silent.await.unwrap();
}
