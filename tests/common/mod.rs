//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use resource_manager::config::{ResourceManagerConfig, RetryConfig};
use resource_manager::model::ProjectInfo;
use resource_manager::testing::LocalResourceManager;
use resource_manager::ResourceManager;

/// Fake service plus a client over it with fast retries.
pub fn local_client(max_attempts: u32) -> (Arc<LocalResourceManager>, ResourceManager) {
    let local = LocalResourceManager::new();
    let client = local.client(RetryConfig::fast(max_attempts));
    (local, client)
}

/// Serve `router` on an ephemeral local port.
pub async fn start_mock_service(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    addr
}

/// HTTP client pointed at a mock service.
pub fn http_client(addr: SocketAddr, max_attempts: u32) -> ResourceManager {
    let mut config = ResourceManagerConfig::default();
    config.endpoint = format!("http://{addr}/");
    config.retries = RetryConfig::fast(max_attempts);
    ResourceManager::from_config(&config).unwrap()
}

pub fn partial_project() -> ProjectInfo {
    ProjectInfo::builder("partial-project").build()
}

pub fn complete_project() -> ProjectInfo {
    ProjectInfo::builder("complete-project")
        .name("name")
        .add_label("k1", "v1")
        .add_label("k2", "v2")
        .build()
}
