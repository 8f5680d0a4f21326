mod support;

fn level_payload(lobby_id: &str) -> serde_json::Value {
    serde_json::json!({
        "lobby_id": lobby_id,
        "level": {
            "visibility": "visible",
            "life": 2,
            "zones": [
                { "kind": { "type": "pickup", "value": 3 }, "x": 4.0, "y": 0.0 },
                { "kind": { "type": "hazard" }, "x": -4.0, "y": 0.0,
                  "shape": { "type": "rect", "half_width": 1.0, "half_height": 1.0 } }
            ]
        }
    })
}

#[tokio::test]
async fn test_lobby_creation() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let lobby_id = format!("test-{}", uuid::Uuid::new_v4());

    let res = client
        .post(format!("{base_url}/lobbies"))
        .json(&level_payload(&lobby_id))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["lobby_id"], lobby_id.as_str());

    let again = client
        .post(format!("{base_url}/lobbies"))
        .json(&level_payload(&lobby_id))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(again.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_lobby_creation_requires_an_id() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({ "lobby_id": "   " }))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["error"], "lobby_id is required");
}

#[tokio::test]
async fn test_lobby_deletion() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let lobby_id = format!("test-{}", uuid::Uuid::new_v4());

    let res = client
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({ "lobby_id": lobby_id }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let deleted = client
        .delete(format!("{base_url}/lobbies/{lobby_id}"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

    let missing = client
        .delete(format!("{base_url}/lobbies/{lobby_id}"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    // The default lobby is pinned.
    let pinned = client
        .delete(format!("{base_url}/lobbies/test"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(pinned.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_level_load_for_unknown_lobby_is_not_found() {
    let base_url = support::ensure_server();
    let lobby_id = format!("missing-{}", uuid::Uuid::new_v4());

    let res = reqwest::Client::new()
        .put(format!("{base_url}/lobbies/{lobby_id}/level"))
        .json(&serde_json::json!({ "zones": [] }))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["error"], "lobby not found");
}
