//! Local HTTP stand-ins for the live APIs
//!
//! Each test builds an axum router with the routes it needs and points the
//! adapter at the returned base URL.

use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral localhost port
///
/// Returns the base URL (no trailing slash). The server lives until the
/// test's runtime shuts down.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
