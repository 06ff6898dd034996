//! Ensemble connection supervisor
//!
//! `EnsembleClient` keeps a TCP connection open to one ensemble member at a
//! time, cycling through members on failure. Connection attempts are bounded
//! by the connection timeout. The retry policy spaces out both failed attempts
//! and reconnects after a dropped connection. A suspension outliving the
//! session timeout is reported as `Lost`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use ensemble_core::{config::to_millis, ConnectionState, Error, Result, RetryPolicy};

use crate::builder::{ClientOptions, CoordinationClient};
use crate::connect_string::{EnsembleAddress, ServerAddress};
use crate::paths;

struct Inner {
    id: Uuid,
    options: ClientOptions,
    address: EnsembleAddress,
    started: AtomicBool,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == next || current.is_terminal() {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            info!(client_id = %self.id, state = %next, "Connection state changed");
        }
    }

    fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.options.connection_timeout_ms)
    }

    fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.options.session_timeout_ms)
    }
}

/// Connection handle to a coordination-service ensemble
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct EnsembleClient {
    inner: Arc<Inner>,
    namespace: Option<String>,
}

impl EnsembleClient {
    /// Create a latent client from builder options
    pub fn new(options: ClientOptions) -> Result<Self> {
        let address = EnsembleAddress::parse(options.require_connect_string()?)?;
        let namespace = options.namespace.clone();
        let (state_tx, _) = watch::channel(ConnectionState::Latent);
        let (shutdown_tx, _) = watch::channel(false);

        let id = Uuid::new_v4();
        debug!(client_id = %id, ensemble = %address, "Ensemble client created");

        Ok(Self {
            inner: Arc::new(Inner {
                id,
                options,
                address,
                started: AtomicBool::new(false),
                state_tx,
                shutdown_tx,
                supervisor: Mutex::new(None),
            }),
            namespace,
        })
    }

    /// Unique id of the underlying connection
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Parsed ensemble address
    pub fn ensemble(&self) -> &EnsembleAddress {
        &self.inner.address
    }

    /// Options the client was built with
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn retry_policy(&self) -> &Arc<dyn RetryPolicy> {
        &self.inner.options.retry_policy
    }

    pub fn can_be_read_only(&self) -> bool {
        self.inner.options.can_be_read_only
    }

    /// Watch connection state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Wait until connected or `timeout` elapses
    ///
    /// Returns true if the client is connected.
    pub async fn block_until_connected(&self, timeout: Duration) -> bool {
        let mut rx = self.subscribe();
        let connected = tokio::time::timeout(timeout, rx.wait_for(|s| s.is_connected())).await;
        matches!(connected, Ok(Ok(_)))
    }

    /// A view of this client scoped to another namespace
    ///
    /// The returned handle shares the connection.
    pub fn using_namespace(&self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            inner: Arc::clone(&self.inner),
            namespace: (!namespace.is_empty()).then_some(namespace),
        }
    }

    /// Apply this client's namespace to an absolute path
    pub fn namespaced_path(&self, path: &str) -> Result<String> {
        paths::fix_for_namespace(self.namespace.as_deref().unwrap_or(""), path)
    }

    /// Compress a payload destined for `path`
    pub fn compress(&self, path: &str, data: &[u8]) -> Result<Bytes> {
        self.inner.options.compression_provider.compress(path, data)
    }

    /// Decompress a payload read from `path`
    pub fn decompress(&self, path: &str, data: &[u8]) -> Result<Bytes> {
        self.inner.options.compression_provider.decompress(path, data)
    }
}

impl std::fmt::Debug for EnsembleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleClient")
            .field("id", &self.inner.id)
            .field("ensemble", &self.inner.address.to_string())
            .field("namespace", &self.namespace)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl CoordinationClient for EnsembleClient {
    #[instrument(skip(self), fields(client_id = %self.inner.id))]
    async fn start(&self) -> Result<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted {
                client_id: self.inner.id.to_string(),
            });
        }

        info!(ensemble = %self.inner.address, "Starting ensemble client");
        self.inner.set_state(ConnectionState::Connecting);

        let shutdown_rx = self.inner.shutdown_tx.subscribe();
        let handle = tokio::spawn(supervise(Arc::clone(&self.inner), shutdown_rx));
        *self.inner.supervisor.lock() = Some(handle);
        Ok(())
    }

    #[instrument(skip(self), fields(client_id = %self.inner.id))]
    async fn close(&self) -> Result<()> {
        self.inner.started.store(true, Ordering::SeqCst);
        self.inner.shutdown_tx.send_replace(true);

        let handle = self.inner.supervisor.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Supervisor task failed");
            }
        }

        self.inner.set_state(ConnectionState::Closed);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// Connection loop; runs until shutdown is signalled
async fn supervise(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let servers = inner.address.servers();
    let mut next = 0usize;
    let mut retry_count = 0u32;
    let mut retry_started = Instant::now();
    let mut suspended_since: Option<Instant> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let server = &servers[next % servers.len()];
        next = next.wrapping_add(1);

        let attempt = tokio::select! {
            _ = shutdown.changed() => break,
            result = connect(server, inner.connection_timeout()) => result,
        };

        match attempt {
            Ok(stream) => {
                retry_count = 0;
                suspended_since = None;
                inner.set_state(ConnectionState::Connected);
                info!(client_id = %inner.id, server = %server, "Connected to ensemble member");

                let disconnect = tokio::select! {
                    _ = shutdown.changed() => break,
                    result = wait_for_disconnect(stream) => result,
                };

                match disconnect {
                    Ok(()) => warn!(client_id = %inner.id, server = %server, "Ensemble member closed the connection"),
                    Err(e) => warn!(client_id = %inner.id, server = %server, error = %e, "Connection to ensemble member failed"),
                }

                // A dropped connection counts as a failed attempt
                inner.set_state(ConnectionState::Suspended);
                suspended_since = Some(Instant::now());
                retry_started = Instant::now();
            }
            Err(e) => {
                debug!(client_id = %inner.id, error = %e, retry_count, "Connection attempt failed");
            }
        }

        if let Some(since) = suspended_since {
            if since.elapsed() >= inner.session_timeout() {
                warn!(client_id = %inner.id, "Session timeout elapsed while suspended");
                inner.set_state(ConnectionState::Lost);
            }
        }

        let sleep = match inner
            .options
            .retry_policy
            .allow_retry(retry_count, retry_started.elapsed())
        {
            Some(sleep) => {
                retry_count += 1;
                sleep
            }
            None => {
                warn!(
                    client_id = %inner.id,
                    retries = retry_count,
                    "Retry policy exhausted, connection lost"
                );
                inner.set_state(ConnectionState::Lost);
                retry_count = 0;
                retry_started = Instant::now();
                inner.session_timeout()
            }
        };

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(sleep) => {}
        }
    }

    debug!(client_id = %inner.id, "Supervisor stopped");
}

async fn connect(server: &ServerAddress, timeout: Duration) -> Result<TcpStream> {
    let address = server.to_string();
    match tokio::time::timeout(timeout, TcpStream::connect((server.host.as_str(), server.port)))
        .await
    {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(Error::Connection {
            address,
            message: e.to_string(),
        }),
        Err(_) => Err(Error::ConnectionTimeout {
            address,
            timeout_ms: to_millis(timeout),
        }),
    }
}

/// Resolves when the peer closes the stream or it errors
async fn wait_for_disconnect(mut stream: TcpStream) -> std::io::Result<()> {
    let mut buf = [0u8; 512];
    loop {
        if stream.read(&mut buf).await? == 0 {
            return Ok(());
        }
    }
}
