mod support;

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn create_lobby(lobby_id: &str) {
    let base_url = support::ensure_server();
    let res = reqwest::Client::new()
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({ "lobby_id": lobby_id }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
}

async fn join(lobby_id: &str, player_id: u64, x: f32, y: f32) -> Ws {
    let url = support::ws_url(&format!("lobby_id={lobby_id}&player_id={player_id}"));
    let (mut ws, _) = connect_async(url).await.expect("ws connect");
    let join = serde_json::json!({
        "type": "Join",
        "data": { "display_name": format!("p{player_id}"), "mass": 1.0, "position": { "x": x, "y": y } }
    });
    ws.send(Message::text(join.to_string())).await.expect("send join");
    ws
}

async fn next_json(ws: &mut Ws) -> serde_json::Value {
    loop {
        let msg = ws
            .next()
            .await
            .expect("stream ended")
            .expect("ws error");
        if let Ok(text) = msg.to_text() {
            if !text.is_empty() {
                return serde_json::from_str(text).expect("server sends json");
            }
        }
    }
}

async fn wait_for(ws: &mut Ws, pred: impl Fn(&serde_json::Value) -> bool) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let value = next_json(ws).await;
            if pred(&value) {
                return value;
            }
        }
    })
    .await
    .expect("expected message did not arrive")
}

#[tokio::test]
async fn test_join_receives_identity_first() {
    let lobby_id = format!("ws-{}", uuid::Uuid::new_v4());
    create_lobby(&lobby_id).await;

    let mut ws = join(&lobby_id, 41, 0.0, 0.0).await;
    let first = next_json(&mut ws).await;

    assert_eq!(first["type"], "Identity");
    assert_eq!(first["data"]["player_id"], "41");
}

#[tokio::test]
async fn test_two_players_move_the_sphere_to_their_midpoint() {
    let lobby_id = format!("ws-{}", uuid::Uuid::new_v4());
    create_lobby(&lobby_id).await;

    let mut a = join(&lobby_id, 1, 0.0, 0.0).await;
    let mut b = join(&lobby_id, 2, 10.0, 0.0).await;

    let update = wait_for(&mut a, |v| {
        v["type"] == "WorldUpdate" && v["data"]["players"].as_array().map(Vec::len) == Some(2)
    })
    .await;
    assert_eq!(update["data"]["sphere"]["x"], 5.0);
    assert_eq!(update["data"]["sphere"]["y"], 0.0);

    let move_b = serde_json::json!({ "type": "Position", "data": { "x": 10.0, "y": 10.0 } });
    b.send(Message::text(move_b.to_string())).await.expect("send position");

    let update = wait_for(&mut a, |v| {
        v["type"] == "WorldUpdate" && v["data"]["sphere"]["y"] == 5.0
    })
    .await;
    assert_eq!(update["data"]["sphere"]["x"], 5.0);
}

#[tokio::test]
async fn test_message_before_join_is_rejected() {
    let lobby_id = format!("ws-{}", uuid::Uuid::new_v4());
    create_lobby(&lobby_id).await;

    let url = support::ws_url(&format!("lobby_id={lobby_id}&player_id=9"));
    let (mut ws, _) = connect_async(url).await.expect("ws connect");
    ws.send(Message::text(r#"{"type":"Pause"}"#.to_string()))
        .await
        .expect("send pause");

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return true,
                Ok(_) => continue,
            }
        }
        true
    })
    .await
    .expect("server should close the socket");
    assert!(closed);
}

#[tokio::test]
async fn test_loading_a_level_restarts_a_failed_lobby() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let lobby_id = format!("ws-{}", uuid::Uuid::new_v4());

    let res = client
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({
            "lobby_id": lobby_id,
            "level": {
                "life": 1,
                "zones": [
                    { "kind": { "type": "hazard" }, "x": 0.0, "y": 0.0,
                      "shape": { "type": "circle", "radius": 2.0 } }
                ]
            }
        }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let mut ws = join(&lobby_id, 7, 0.0, 0.0).await;
    wait_for(&mut ws, |v| v["type"] == "GameState" && v["data"] == "LevelFailed").await;

    let loaded = client
        .put(format!("{base_url}/lobbies/{lobby_id}/level"))
        .json(&serde_json::json!({ "life": 3, "zones": [] }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(loaded.status(), reqwest::StatusCode::ACCEPTED);

    wait_for(&mut ws, |v| v["type"] == "GameState" && v["data"] == "LevelRunning").await;
    let update = wait_for(&mut ws, |v| {
        v["type"] == "WorldUpdate" && v["data"]["life"] == 3
    })
    .await;
    assert_eq!(update["data"]["critical"], false);
}
