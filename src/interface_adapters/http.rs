// JSON error body shared by the lobby routes and the WebSocket upgrade.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
