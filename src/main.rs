#[tokio::main]
async fn main() {
    // Startup errors are already logged where they happen.
    if let Err(e) = cdm_server::run_with_config().await {
        eprintln!("server exited: {e}");
        std::process::exit(1);
    }
}
