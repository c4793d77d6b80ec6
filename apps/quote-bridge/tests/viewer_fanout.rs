//! Integration tests for the viewer WebSocket server.
//!
//! A real viewer connection is driven with a tokio-tungstenite client
//! against a server wired to an in-process broadcast hub.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use quote_bridge::infrastructure::broadcast::OptionQuoteBroadcast;
use quote_bridge::infrastructure::upstream::messages::OptionQuoteData;
use quote_bridge::infrastructure::upstream::monitor::MonitorConfig;
use quote_bridge::infrastructure::upstream::reconnect::ReconnectPolicy;
use quote_bridge::{
    BroadcastHub, ConnectionStats, MessageRouter, SubscriptionFacade, UpstreamClient,
    UpstreamClientConfig, ViewerServer,
};

type ViewerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    hub: Arc<BroadcastHub>,
    stats: Arc<ConnectionStats>,
    addr: SocketAddr,
    cancel: CancellationToken,
}

/// Reserve an ephemeral port the viewer server can bind afterwards.
async fn reserve_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn start_harness() -> Harness {
    let stats = Arc::new(ConnectionStats::new());
    let hub = Arc::new(BroadcastHub::with_defaults());
    let router = MessageRouter::new(Arc::clone(&hub), Arc::clone(&stats));
    let cancel = CancellationToken::new();

    // An upstream client that never runs; the handle still gates sends on
    // the shared connection state.
    let config = UpstreamClientConfig {
        url: "ws://127.0.0.1:1".to_string(),
        reconnect: ReconnectPolicy::default(),
        monitor: MonitorConfig::default(),
    };
    let (_client, handle) =
        UpstreamClient::new(config, Arc::clone(&stats), router, cancel.clone());
    let facade = SubscriptionFacade::new(handle);

    let addr = reserve_port().await;
    let server = ViewerServer::new(addr, Arc::clone(&hub), facade, cancel.clone());
    tokio::spawn(server.run());

    Harness {
        hub,
        stats,
        addr,
        cancel,
    }
}

async fn connect_viewer(addr: SocketAddr) -> ViewerSocket {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match tokio_tungstenite::connect_async(format!("ws://{addr}")).await {
            Ok((ws, _)) => return ws,
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(e) => panic!("viewer could not connect: {e}"),
        }
    }
}

async fn next_json(ws: &mut ViewerSocket) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("viewer should receive a frame")
            .expect("socket should stay open")
            .expect("frame should be readable");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn viewer_receives_status_catchup_on_attach() {
    let harness = start_harness().await;
    harness
        .stats
        .set_subscribed_symbols(vec!["AAPL  260220C00230000".to_string()]);

    let mut viewer = connect_viewer(harness.addr).await;
    let frame = next_json(&mut viewer).await;

    assert_eq!(frame["type"], "status");
    assert_eq!(frame["data"]["state"], "disconnected");
    assert_eq!(
        frame["data"]["subscribed_symbols"][0],
        "AAPL  260220C00230000"
    );

    harness.cancel.cancel();
}

#[tokio::test]
async fn broadcasts_reach_every_viewer() {
    let harness = start_harness().await;

    let mut viewer_a = connect_viewer(harness.addr).await;
    let mut viewer_b = connect_viewer(harness.addr).await;
    let _ = next_json(&mut viewer_a).await; // catch-up status
    let _ = next_json(&mut viewer_b).await;

    // Wait until both viewers' receivers are registered.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while harness.hub.viewer_count() < 2 {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let _ = harness.hub.send_option_quote(OptionQuoteBroadcast {
        timestamp: Some("2026-02-20T14:30:00".to_string()),
        quote: OptionQuoteData {
            symbol: "SPY   260320P00500000".to_string(),
            ..Default::default()
        },
    });

    for viewer in [&mut viewer_a, &mut viewer_b] {
        let frame = next_json(viewer).await;
        assert_eq!(frame["type"], "option_quote");
        assert_eq!(frame["data"]["symbol"], "SPY   260320P00500000");
        assert_eq!(frame["timestamp"], "2026-02-20T14:30:00");
    }

    harness.cancel.cancel();
}

#[tokio::test]
async fn viewer_ping_is_answered_locally() {
    let harness = start_harness().await;
    let mut viewer = connect_viewer(harness.addr).await;
    let _ = next_json(&mut viewer).await;

    viewer
        .send(Message::Text(r#"{"command":"ping"}"#.into()))
        .await
        .unwrap();

    let frame = next_json(&mut viewer).await;
    assert_eq!(frame["type"], "pong");

    harness.cancel.cancel();
}

#[tokio::test]
async fn viewer_get_status_is_answered_on_that_socket_only() {
    let harness = start_harness().await;
    let mut asker = connect_viewer(harness.addr).await;
    let mut bystander = connect_viewer(harness.addr).await;
    let _ = next_json(&mut asker).await;
    let _ = next_json(&mut bystander).await;

    asker
        .send(Message::Text(r#"{"command":"get_status"}"#.into()))
        .await
        .unwrap();

    let frame = next_json(&mut asker).await;
    assert_eq!(frame["type"], "status");

    // The bystander receives nothing for another viewer's query.
    let quiet = tokio::time::timeout(Duration::from_millis(300), bystander.next()).await;
    assert!(quiet.is_err(), "bystander should not see the reply");

    harness.cancel.cancel();
}

#[tokio::test]
async fn invalid_viewer_json_is_ignored() {
    let harness = start_harness().await;
    let mut viewer = connect_viewer(harness.addr).await;
    let _ = next_json(&mut viewer).await;

    viewer
        .send(Message::Text("{garbage".into()))
        .await
        .unwrap();

    // The connection survives and still answers pings.
    viewer
        .send(Message::Text(r#"{"command":"ping"}"#.into()))
        .await
        .unwrap();
    let frame = next_json(&mut viewer).await;
    assert_eq!(frame["type"], "pong");

    harness.cancel.cancel();
}

#[tokio::test]
async fn subscription_command_while_disconnected_does_not_break_viewer() {
    let harness = start_harness().await;
    let mut viewer = connect_viewer(harness.addr).await;
    let _ = next_json(&mut viewer).await;

    viewer
        .send(Message::Text(
            r#"{"command":"subscribe_options","symbols":["AAPL  260220C00230000"]}"#.into(),
        ))
        .await
        .unwrap();

    // Upstream is disconnected so the forward fails quietly; the viewer
    // connection itself keeps working.
    viewer
        .send(Message::Text(r#"{"command":"ping"}"#.into()))
        .await
        .unwrap();
    let frame = next_json(&mut viewer).await;
    assert_eq!(frame["type"], "pong");

    assert_eq!(harness.stats.snapshot().messages_sent, 0);

    harness.cancel.cancel();
}
