//! In-process stand-in for the tree backend, used by client tests.

use axum::Router;
use tokio::net::TcpListener;

/// Serve `routes` under `/api` on an ephemeral port; returns the base URL
pub async fn spawn(routes: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub backend");
    let addr = listener.local_addr().expect("stub backend addr");
    let app = Router::new().nest("/api", routes);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("[Stub] Server error: {}", e);
        }
    });

    format!("http://{}/api", addr)
}

/// Base URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{}/api", addr)
}
