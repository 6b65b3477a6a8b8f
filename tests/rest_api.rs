//! REST API integration tests. Spawn the server and call endpoints with reqwest.
//!
//! Every simulated client sends its own `X-Forwarded-For` so the single loopback
//! peer maps to distinct identities.

use ctf_coordinator::{api, ServerConfig};
use serde_json::{json, Value};
use std::net::SocketAddr;

async fn spawn_app() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        trust_forwarded_for: true,
        ..Default::default()
    };
    let app = api::create_router(&config);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    (addr, handle)
}

struct TestClient {
    base: String,
    http: reqwest::Client,
}

impl TestClient {
    fn new(addr: SocketAddr) -> Self {
        Self {
            base: format!("http://{}", addr),
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, source: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .header("x-forwarded-for", source)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn get(&self, path: &str, source: &str) -> (u16, Value) {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .header("x-forwarded-for", source)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn join(&self, code: i64, source: &str) -> String {
        let (status, json) = self.post("/api/player/join", source, json!({ "code": code })).await;
        assert_eq!(status, 200, "join failed: {}", json);
        json["playerId"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn status_returns_ok_and_hostname() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let (status, json) = client.get("/status", "10.0.0.1").await;
    assert_eq!(status, 200);
    assert_eq!(json["ok"], json!(true));
    assert!(json["hostname"].as_str().map(|h| !h.is_empty()).unwrap_or(false));
}

#[tokio::test]
async fn join_returns_player_and_list_identifies_caller() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let (status, json) = client
        .post("/api/player/join", "10.0.0.1", json!({ "code": 7 }))
        .await;
    assert_eq!(status, 200);
    let id = json["playerId"].as_str().unwrap().to_string();
    assert_eq!(json["player"]["id"], json!(id));
    assert_eq!(json["player"]["number"], json!(4));
    assert_eq!(json["player"]["health"], json!(100));
    assert_eq!(json["player"]["team"], json!("blue"));

    let (status, list) = client.get("/api/players", "10.0.0.1").await;
    assert_eq!(status, 200);
    assert_eq!(list["myPlayerId"], json!(id));
    assert_eq!(list["players"].as_array().unwrap().len(), 1);
    assert_eq!(list["flagHolder"], Value::Null);
    assert_eq!(list["teams"]["blue"]["flagsCaptured"], json!(0));
    assert_eq!(list["teams"]["red"]["name"], json!("Red"));

    let (_, other) = client.get("/api/players", "10.0.0.2").await;
    assert_eq!(other["myPlayerId"], Value::Null);
}

#[tokio::test]
async fn join_invalid_code_returns_400() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    for body in [json!({ "code": 150 }), json!({ "code": -1 }), json!({ "code": "abc" }), json!({})] {
        let (status, json) = client.post("/api/player/join", "10.0.0.1", body).await;
        assert_eq!(status, 400);
        assert!(json.get("error").is_some());
    }
    let (_, list) = client.get("/api/players", "10.0.0.1").await;
    assert!(list["players"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn join_conflicts_return_409() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    client.join(7, "10.0.0.1").await;
    let (status, _) = client
        .post("/api/player/join", "10.0.0.2", json!({ "code": 7 }))
        .await;
    assert_eq!(status, 409, "duplicate code");
    let (status, _) = client
        .post("/api/player/join", "10.0.0.1", json!({ "code": 8 }))
        .await;
    assert_eq!(status, 409, "duplicate identity");
    let (_, list) = client.get("/api/players", "10.0.0.1").await;
    assert_eq!(list["players"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn kill_drops_flag_and_blocks_capture() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let p1 = client.join(7, "10.0.0.1").await;
    let p2 = client.join(3, "10.0.0.2").await;

    let (status, obtained) = client
        .post("/api/flag/obtain", "10.0.0.1", json!({ "playerId": p1 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(obtained["flagHolder"], json!(p1));
    assert_eq!(obtained["previousHolder"], Value::Null);

    let (status, attack) = client
        .post(
            "/api/player/attack",
            "10.0.0.2",
            json!({ "attackerId": p2, "targetId": p1, "damage": 100 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(attack["killed"], json!(true));
    assert_eq!(attack["target"]["health"], json!(100));
    assert_eq!(attack["attacker"]["kills"], json!(1));
    assert_eq!(attack["flagHolder"], Value::Null);

    let (status, json) = client
        .post("/api/flag/capture", "10.0.0.1", json!({ "playerId": p1 }))
        .await;
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("not holding"));
}

#[tokio::test]
async fn capture_scores_for_holder_team() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let p1 = client.join(1, "10.0.0.1").await;
    let p2 = client.join(2, "10.0.0.2").await;
    client
        .post("/api/flag/obtain", "10.0.0.2", json!({ "playerId": p2 }))
        .await;
    let (status, stolen) = client
        .post("/api/flag/obtain", "10.0.0.1", json!({ "playerId": p1 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(stolen["previousHolder"], json!(p2));

    let (status, _) = client
        .post("/api/flag/capture", "10.0.0.2", json!({ "playerId": p2 }))
        .await;
    assert_eq!(status, 400);

    let (status, captured) = client
        .post("/api/flag/capture", "10.0.0.1", json!({ "playerId": p1 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(captured["team"], json!("blue"));
    assert_eq!(captured["flagsCaptured"], json!(1));
    assert_eq!(captured["flagHolder"], Value::Null);
}

#[tokio::test]
async fn unknown_ids_return_404() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let p1 = client.join(1, "10.0.0.1").await;
    let cases = [
        ("/api/player/update", json!({ "playerId": "ghost", "kills": 1 })),
        ("/api/player/leave", json!({ "playerId": "ghost" })),
        ("/api/flag/obtain", json!({ "playerId": "ghost" })),
        ("/api/flag/capture", json!({ "playerId": "ghost" })),
        ("/api/player/attack", json!({ "attackerId": p1, "targetId": "ghost" })),
        ("/api/player/heal", json!({ "healerId": "ghost", "targetId": p1 })),
        ("/api/player/changeTeam", json!({ "playerId": "ghost", "team": "red" })),
    ];
    for (path, body) in cases {
        let (status, json) = client.post(path, "10.0.0.1", body).await;
        assert_eq!(status, 404, "{}", path);
        assert!(json.get("error").is_some());
    }
    let response = client
        .http
        .delete(format!("{}/api/player/ghost", client.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn self_attack_and_bad_team_return_400() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let p1 = client.join(1, "10.0.0.1").await;
    let (status, _) = client
        .post(
            "/api/player/attack",
            "10.0.0.1",
            json!({ "attackerId": p1, "targetId": p1, "damage": 5 }),
        )
        .await;
    assert_eq!(status, 400);
    let (status, _) = client
        .post("/api/player/changeTeam", "10.0.0.1", json!({ "playerId": p1, "team": "green" }))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn update_heal_and_change_team_round_trip() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let p1 = client.join(1, "10.0.0.1").await;

    let (status, json) = client
        .post(
            "/api/player/update",
            "10.0.0.1",
            json!({ "playerId": p1, "kills": -3, "health": "40" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(json["player"]["kills"], json!(0));
    assert_eq!(json["player"]["health"], json!(40));

    let (status, json) = client
        .post("/api/player/heal", "10.0.0.1", json!({ "targetId": p1, "amount": "lots" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(json["target"]["health"], json!(60));

    let (status, json) = client
        .post("/api/player/changeTeam", "10.0.0.1", json!({ "playerId": p1, "team": "red" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(json["player"]["team"], json!("red"));

    let (_, events) = client.get("/api/events", "10.0.0.1").await;
    let messages: Vec<&str> = events["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert!(messages.iter().any(|m| m.starts_with("System healed Player 4 for 20")));
    assert_eq!(messages.last(), Some(&"Player 4 switched to team Red"));
}

#[tokio::test]
async fn delete_and_legacy_leave_remove_players() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let p1 = client.join(1, "10.0.0.1").await;
    let p2 = client.join(2, "10.0.0.2").await;

    let response = client
        .http
        .delete(format!("{}/api/player/{}", client.base, p1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert!(json.get("message").is_some());

    let (status, json) = client
        .post("/api/player/leave", "10.0.0.2", json!({ "playerId": p2 }))
        .await;
    assert_eq!(status, 200);
    assert!(json.get("message").is_some());

    let (_, list) = client.get("/api/players", "10.0.0.1").await;
    assert!(list["players"].as_array().unwrap().is_empty());
    // Identity and code are free again.
    client.join(1, "10.0.0.1").await;
}

#[tokio::test]
async fn restart_clears_match_and_log() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let p1 = client.join(1, "10.0.0.1").await;
    client
        .post("/api/flag/obtain", "10.0.0.1", json!({ "playerId": p1 }))
        .await;
    client
        .post("/api/flag/capture", "10.0.0.1", json!({ "playerId": p1 }))
        .await;

    let (status, json) = client.post("/api/restart", "10.0.0.1", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(json["players"], json!([]));
    assert_eq!(json["flagHolder"], Value::Null);
    assert_eq!(json["teams"]["blue"]["flagsCaptured"], json!(0));
    assert!(json.get("message").is_some());

    let (_, events) = client.get("/api/events", "10.0.0.1").await;
    let events = events["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["message"], json!("Match restarted"));

    let (_, joined) = client
        .post("/api/player/join", "10.0.0.1", json!({ "code": 1 }))
        .await;
    assert_eq!(joined["player"]["number"], json!(4));
}

#[tokio::test]
async fn non_json_body_is_a_validation_error() {
    let (addr, _handle) = spawn_app().await;
    let client = TestClient::new(addr);
    let response = client
        .http
        .post(format!("{}/api/player/join", client.base))
        .header("x-forwarded-for", "10.0.0.1")
        .body("code=7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
