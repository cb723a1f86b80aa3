//! Start/stop orchestration for both listeners.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use textlens_api::ws::ConnectionRegistry;
use textlens_api::{
    create_router, create_ws_router, AppState, AuthGate, EventBus, RequestLog, ServerConfig,
    ServerEvent, SubscriptionId,
};
use textlens_engine::{RecognizerGate, TextRecognizer};
use textlens_models::{OcrLanguage, RequestLogEntry};

/// How long graceful shutdown may drain open connections before the
/// listener tasks are aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Observable serving-layer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Factory for a fresh recognition capability per start.
pub type RecognizerFactory = Box<dyn Fn() -> Arc<dyn TextRecognizer> + Send + Sync>;

struct RunningServers {
    http_task: JoinHandle<()>,
    ws_task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    http_addr: SocketAddr,
    ws_addr: SocketAddr,
    engine: Arc<RecognizerGate>,
    connections: Arc<ConnectionRegistry>,
    request_log: Arc<RequestLog>,
}

struct Inner {
    state: LifecycleState,
    config: ServerConfig,
    servers: Option<RunningServers>,
}

/// Owns one HTTP listener, one realtime hub and one recognizer handle.
pub struct LifecycleManager {
    inner: Mutex<Inner>,
    auth: Arc<AuthGate>,
    events: EventBus,
    recognizer_factory: RecognizerFactory,
    metrics_handle: Option<PrometheusHandle>,
}

impl LifecycleManager {
    pub fn new<F>(config: ServerConfig, recognizer_factory: F) -> Self
    where
        F: Fn() -> Arc<dyn TextRecognizer> + Send + Sync + 'static,
    {
        let auth = Arc::new(AuthGate::new(
            config.auth_enabled,
            config.auth_token.clone(),
        ));
        Self {
            inner: Mutex::new(Inner {
                state: LifecycleState::Stopped,
                config,
                servers: None,
            }),
            auth,
            events: EventBus::new(),
            recognizer_factory: Box::new(recognizer_factory),
            metrics_handle: None,
        }
    }

    /// Attach a Prometheus handle; the HTTP listener then serves `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Start both listeners on the given ports.
    ///
    /// A no-op with a warning when already starting or running. On any
    /// bind failure the manager returns to `Stopped` and reports the
    /// error; it does not retry.
    pub async fn start(&self, http_port: u16, ws_port: u16) -> std::io::Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            LifecycleState::Running | LifecycleState::Starting => {
                warn!("server is already running");
                return Ok(());
            }
            _ => inner.state = LifecycleState::Starting,
        }

        let mut config = inner.config.clone();
        config.http_port = http_port;
        config.ws_port = ws_port;

        let host = config.host.clone();
        let (http_listener, ws_listener) = match bind_pair(&host, http_port, ws_port).await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "failed to bind listeners");
                inner.state = LifecycleState::Stopped;
                return Err(e);
            }
        };

        // Ephemeral port requests (port 0) resolve here.
        let http_addr = http_listener.local_addr()?;
        let ws_addr = ws_listener.local_addr()?;
        config.http_port = http_addr.port();
        config.ws_port = ws_addr.port();

        let engine = Arc::new(RecognizerGate::new(
            (self.recognizer_factory)(),
            config.gate_config(),
        ));

        let state = AppState::new(
            config,
            Arc::clone(&self.auth),
            Arc::clone(&engine),
            self.events.clone(),
        );
        let connections = Arc::clone(&state.connections);
        let request_log = Arc::clone(&state.request_log);

        let app = create_router(state.clone(), self.metrics_handle.clone());
        let ws_app = create_ws_router(state);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let http_task = tokio::spawn(serve(http_listener, app, shutdown_rx.clone(), "http"));
        let ws_task = tokio::spawn(serve(ws_listener, ws_app, shutdown_rx, "ws"));

        inner.servers = Some(RunningServers {
            http_task,
            ws_task,
            shutdown_tx,
            http_addr,
            ws_addr,
            engine,
            connections,
            request_log,
        });
        inner.state = LifecycleState::Running;

        info!(http = %http_addr, ws = %ws_addr, "OCR server started");
        Ok(())
    }

    /// Tear down both listeners and release the recognizer. Idempotent.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let Some(mut servers) = inner.servers.take() else {
            inner.state = LifecycleState::Stopped;
            return;
        };
        inner.state = LifecycleState::Stopping;

        let _ = servers.shutdown_tx.send(true);
        for task in [&mut servers.http_task, &mut servers.ws_task] {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut *task).await.is_err() {
                task.abort();
            }
        }

        // The only remaining gate handle; dropping it releases the
        // capability exactly once.
        drop(servers.engine);

        inner.state = LifecycleState::Stopped;
        info!("OCR server stopped");
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == LifecycleState::Running
    }

    /// Actual bound HTTP address while running.
    pub async fn http_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().await.servers.as_ref().map(|s| s.http_addr)
    }

    /// Actual bound WebSocket address while running.
    pub async fn ws_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().await.servers.as_ref().map(|s| s.ws_addr)
    }

    /// Displayable `http://ip:port` for devices on the same network.
    pub async fn server_address(&self) -> String {
        let inner = self.inner.lock().await;
        let port = inner
            .servers
            .as_ref()
            .map(|s| s.http_addr.port())
            .unwrap_or(inner.config.http_port);
        crate::net::server_address(port)
    }

    /// Displayable `ws://ip:port/ws` for devices on the same network.
    pub async fn websocket_address(&self) -> String {
        let inner = self.inner.lock().await;
        let port = inner
            .servers
            .as_ref()
            .map(|s| s.ws_addr.port())
            .unwrap_or(inner.config.ws_port);
        crate::net::websocket_address(port)
    }

    /// Register an observer for request-logged and connection-count
    /// events; delivery is via a bounded channel, lagging observers drop
    /// events rather than blocking producers.
    pub fn subscribe(&self) -> (SubscriptionId, mpsc::Receiver<ServerEvent>) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }

    /// The shared auth gate; mutate only while stopped.
    pub fn auth(&self) -> &Arc<AuthGate> {
        &self.auth
    }

    /// Select the recognition language. Only applied while stopped.
    pub async fn set_language(&self, language: OcrLanguage) {
        let mut inner = self.inner.lock().await;
        if inner.state != LifecycleState::Stopped {
            warn!("ignoring language change while running");
            return;
        }
        inner.config.language = language;
    }

    /// Push a broadcast frame to every open realtime connection.
    pub async fn broadcast(&self, message: &str) {
        if let Some(servers) = self.inner.lock().await.servers.as_ref() {
            servers.connections.broadcast(message);
        }
    }

    /// Open realtime connections right now.
    pub async fn connection_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .servers
            .as_ref()
            .map(|s| s.connections.count())
            .unwrap_or(0)
    }

    /// Snapshot of the bounded request log.
    pub async fn request_logs(&self) -> Vec<RequestLogEntry> {
        self.inner
            .lock()
            .await
            .servers
            .as_ref()
            .map(|s| s.request_log.snapshot())
            .unwrap_or_default()
    }

    pub async fn clear_logs(&self) {
        if let Some(servers) = self.inner.lock().await.servers.as_ref() {
            servers.request_log.clear();
        }
    }
}

async fn bind_pair(
    host: &str,
    http_port: u16,
    ws_port: u16,
) -> std::io::Result<(TcpListener, TcpListener)> {
    let http_listener = TcpListener::bind((host, http_port)).await?;
    let ws_listener = TcpListener::bind((host, ws_port)).await?;
    Ok((http_listener, ws_listener))
}

async fn serve(
    listener: TcpListener,
    app: axum::Router,
    mut shutdown_rx: watch::Receiver<bool>,
    name: &'static str,
) {
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.changed().await;
    })
    .await;

    if let Err(e) = result {
        error!(listener = name, error = %e, "listener terminated with error");
    }
}
