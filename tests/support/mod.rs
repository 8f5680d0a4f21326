// Boots one server per test binary on an ephemeral port.
#![allow(dead_code)]

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

static SERVER_URL: OnceLock<String> = OnceLock::new();

/// Starts the server on first use and returns its `http://host:port` base URL.
pub fn ensure_server() -> &'static str {
    SERVER_URL.get_or_init(|| {
        let published = Arc::new(OnceLock::<String>::new());
        let published_thread = Arc::clone(&published);

        // The server needs its own runtime so it outlives each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_thread.set(format!("http://{addr}"));
                cdm_server::run(listener).await.expect("server failed");
            });
        });

        wait_until_accepting(&published)
    })
}

/// WebSocket URL for the running test server.
pub fn ws_url(query: &str) -> String {
    let base = ensure_server();
    let host = base.strip_prefix("http://").expect("base url should use http://");
    format!("ws://{host}/ws?{query}")
}

fn wait_until_accepting(published: &OnceLock<String>) -> String {
    let base_url = loop {
        if let Some(url) = published.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return base_url;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}
