//! End-to-end tests: a device connects over WebSocket, registers, and is
//! driven through the fulfillment endpoint.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use device_bridge::api;
use device_bridge::app_state::AppState;
use device_bridge::config::BridgeConfig;
use device_bridge::domain::EventBus;
use device_bridge::liveness::{LivenessMonitor, LivenessSettings};
use device_bridge::persistence::MemoryDeviceSetStore;

type DeviceSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TOKEN: &str = "secret";

fn load_config(overrides: &[(&str, &str)]) -> BridgeConfig {
    let lookup = |key: &str| {
        if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
            return Some((*value).to_string());
        }
        match key {
            "ACCESS_TOKENS" => Some(format!("{TOKEN}=device-manager")),
            "PERSISTENCE_ENABLED" => Some("false".to_string()),
            _ => None,
        }
    };
    let Ok(config) = BridgeConfig::from_lookup(lookup) else {
        panic!("config should load");
    };
    config
}

fn build_state(config: BridgeConfig) -> AppState {
    AppState::build(config, Arc::new(MemoryDeviceSetStore::new()), EventBus::new(64))
}

async fn serve(state: AppState) -> SocketAddr {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, api::build_app(state)).await;
    });
    addr
}

async fn start_server() -> SocketAddr {
    serve(build_state(load_config(&[]))).await
}

/// Starts a server whose heartbeat runs every second, with the liveness
/// monitor attached the way `main` attaches it.
async fn start_server_with_heartbeat() -> (SocketAddr, LivenessMonitor) {
    let config = load_config(&[("HEARTBEAT_INTERVAL_SECS", "1")]);
    let settings = LivenessSettings::from_config(&config);
    let state = build_state(config);
    let monitor = LivenessMonitor::spawn(
        Arc::clone(&state.connections),
        Arc::clone(&state.registry),
        settings,
    );
    (serve(state).await, monitor)
}

async fn connect_device(addr: SocketAddr, token: Option<&str>) -> Result<DeviceSocket, WsError> {
    let Ok(mut request) = format!("ws://{addr}/device-manager").into_client_request() else {
        panic!("bad ws url");
    };
    if let Some(token) = token {
        let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) else {
            panic!("bad header");
        };
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    connect_async(request).await.map(|(socket, _)| socket)
}

async fn next_json(socket: &mut DeviceSocket) -> Value {
    loop {
        let Ok(Some(Ok(message))) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await
        else {
            panic!("no frame from server");
        };
        if let Message::Text(text) = message {
            let Ok(value) = serde_json::from_str(text.as_str()) else {
                panic!("server sent invalid JSON");
            };
            return value;
        }
    }
}

async fn fulfill(addr: SocketAddr, token: Option<&str>, body: Value) -> (u16, Value) {
    let client = reqwest::Client::new();
    let mut request = client.post(format!("http://{addr}/fulfillment")).json(&body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let Ok(response) = request.send().await else {
        panic!("fulfillment request failed");
    };
    let status = response.status().as_u16();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, value)
}

async fn register(socket: &mut DeviceSocket) {
    let frame = json!({
        "messageType": "register",
        "requestId": "r1",
        "deviceSetId": "living-room",
        "deviceDefinitions": [
            {"id": "lamp1", "type": "action.devices.types.LIGHT", "traits": ["action.devices.traits.OnOff"]}
        ]
    });
    let Ok(()) = socket.send(Message::text(frame.to_string())).await else {
        panic!("send failed");
    };

    let reply = next_json(socket).await;
    assert_eq!(reply["messageType"], "response");
    assert_eq!(reply["requestId"], "r1");
    assert_eq!(reply["requestMessageType"], "register");
    assert_eq!(reply["success"], true);
}

#[tokio::test]
async fn upgrade_without_token_is_rejected() {
    let addr = start_server().await;

    let Err(WsError::Http(response)) = connect_device(addr, None).await else {
        panic!("upgrade should be refused");
    };
    assert_eq!(response.status().as_u16(), 401);

    let Err(WsError::Http(response)) = connect_device(addr, Some("wrong")).await else {
        panic!("upgrade should be refused");
    };
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn registered_device_is_synced_and_commanded() {
    let addr = start_server().await;
    let Ok(mut socket) = connect_device(addr, Some(TOKEN)).await else {
        panic!("device should connect");
    };
    register(&mut socket).await;

    let (status, sync) = fulfill(
        addr,
        Some(TOKEN),
        json!({"requestId": "s1", "inputs": [{"intent": "action.devices.SYNC"}]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(sync["requestId"], "s1");
    assert_eq!(sync["payload"]["agentUserId"], "user9999");
    assert_eq!(sync["payload"]["devices"][0]["id"], "lamp1");
    assert_eq!(sync["payload"]["devices"][0]["type"], "action.devices.types.LIGHT");

    let (_, query) = fulfill(
        addr,
        Some(TOKEN),
        json!({"requestId": "q1", "inputs": [{
            "intent": "action.devices.QUERY",
            "payload": {"devices": [{"id": "lamp1"}]}
        }]}),
    )
    .await;
    assert_eq!(query["payload"]["devices"]["lamp1"]["online"], true);
    assert_eq!(query["payload"]["devices"]["lamp1"]["status"], "SUCCESS");

    let (status, execute) = fulfill(
        addr,
        Some(TOKEN),
        json!({"requestId": "e1", "inputs": [{
            "intent": "action.devices.EXECUTE",
            "payload": {"commands": [{
                "devices": [{"id": "lamp1"}, {"id": "ghost"}],
                "execution": [{"command": "action.devices.commands.OnOff", "params": {"on": true}}]
            }]}
        }]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(execute["payload"]["commands"][0]["ids"][0], "lamp1");
    assert_eq!(execute["payload"]["commands"][0]["status"], "SUCCESS");
    assert_eq!(execute["payload"]["commands"][1]["ids"][0], "ghost");
    assert_eq!(execute["payload"]["commands"][1]["status"], "OFFLINE");

    let frame = next_json(&mut socket).await;
    assert_eq!(frame["messageType"], "execute");
    assert_eq!(frame["device"]["id"], "lamp1");
    assert_eq!(frame["executions"][0]["params"]["on"], true);
}

#[tokio::test]
async fn closed_connection_goes_offline() {
    let addr = start_server().await;
    let Ok(mut socket) = connect_device(addr, Some(TOKEN)).await else {
        panic!("device should connect");
    };
    register(&mut socket).await;
    let _ = socket.close(None).await;

    let query = json!({"requestId": "q1", "inputs": [{"intent": "action.devices.QUERY"}]});
    let mut online = true;
    for _ in 0..50 {
        let (_, answer) = fulfill(addr, Some(TOKEN), query.clone()).await;
        online = answer["payload"]["devices"]["lamp1"]["online"] == true;
        if !online {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!online, "lamp1 should go offline after close");
}

#[tokio::test]
async fn unresponsive_device_is_dropped_but_stays_in_catalogue() {
    let (addr, monitor) = start_server_with_heartbeat().await;
    let Ok(mut socket) = connect_device(addr, Some(TOKEN)).await else {
        panic!("device should connect");
    };
    register(&mut socket).await;
    // From here on the socket is never polled, so server pings go unanswered.

    let query = json!({"requestId": "q1", "inputs": [{"intent": "action.devices.QUERY"}]});
    let mut online = true;
    for _ in 0..50 {
        let (_, answer) = fulfill(addr, Some(TOKEN), query.clone()).await;
        online = answer["payload"]["devices"]["lamp1"]["online"] == true;
        if !online {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert!(!online, "lamp1 should go offline after missing a pong");

    let (status, sync) = fulfill(
        addr,
        Some(TOKEN),
        json!({"requestId": "s1", "inputs": [{"intent": "action.devices.SYNC"}]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(sync["payload"]["devices"][0]["id"], "lamp1");

    drop(socket);
    monitor.shutdown().await;
}

#[tokio::test]
async fn fulfillment_rejects_bad_callers_and_intents() {
    let addr = start_server().await;
    let sync = json!({"requestId": "s1", "inputs": [{"intent": "action.devices.SYNC"}]});

    let (status, _) = fulfill(addr, None, sync).await;
    assert_eq!(status, 401);

    let (status, body) = fulfill(
        addr,
        Some(TOKEN),
        json!({"requestId": "x", "inputs": [{"intent": "action.devices.FOO"}]}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], 1002);

    let (status, body) = fulfill(
        addr,
        Some(TOKEN),
        json!({"requestId": "d", "inputs": [{"intent": "action.devices.DISCONNECT"}]}),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body.get("payload").is_none());
}
