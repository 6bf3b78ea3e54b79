use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::gateway::ConnectionGateway;

/// The gateway owns the registry and the connection table. Every inbound
/// event takes the write lock for its whole dispatch.
pub type SharedGateway = Arc<RwLock<ConnectionGateway>>;

#[derive(Clone)]
pub struct AppState {
    pub gateway: SharedGateway,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let gateway = ConnectionGateway::new(config.limits.clone());
        Self {
            gateway: Arc::new(RwLock::new(gateway)),
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Counts an open WebSocket for as long as it lives.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
