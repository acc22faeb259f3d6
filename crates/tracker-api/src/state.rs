//! Shared application state.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use tracker_core::{
    ActivityStore, ConnectionRegistry, EventDispatcher, EventEmitter, NotificationStore,
    ProjectDirectory,
};
use tracker_db::Database;

use crate::config::RealtimeConfig;

/// State handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub registry: Arc<ConnectionRegistry>,
    pub emitter: Arc<EventEmitter>,
    pub realtime: RealtimeConfig,
    jwt_secret: Arc<Vec<u8>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Wire the registry, dispatcher and emitter on top of `db`.
    pub fn new(db: Database, jwt_secret: impl Into<Vec<u8>>, realtime: RealtimeConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = EventDispatcher::new(registry.clone());
        let directory: Arc<dyn ProjectDirectory> = Arc::new(db.projects.clone());
        let notifications: Arc<dyn NotificationStore> = Arc::new(db.notifications.clone());
        let activities: Arc<dyn ActivityStore> = Arc::new(db.activities.clone());
        let emitter = EventEmitter::new(directory, notifications, activities, dispatcher);

        Self {
            db,
            registry,
            emitter: Arc::new(emitter),
            realtime,
            jwt_secret: Arc::new(jwt_secret.into()),
            shutdown: Arc::new(watch::channel(false).0),
        }
    }

    pub fn jwt_secret(&self) -> &[u8] {
        &self.jwt_secret
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        self.emitter.dispatcher()
    }

    /// Ask open realtime streams to finish.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once [`begin_shutdown`](Self::begin_shutdown) has been called.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown.subscribe();
        async move {
            // An error means the sender is gone, which also ends the wait.
            let _ = rx.wait_for(|stopping| *stopping).await;
        }
    }
}
