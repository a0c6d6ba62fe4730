//! Socket server
//!
//! Accepts Unix-socket connections and runs one protocol engine per
//! connection on its own thread, bounded by `max_connections`. Finished
//! workers report over a completion channel and are reaped opportunistically
//! before each spawn; a connection arriving while the pool is full is
//! dropped at the transport level, with no protocol bytes exchanged.
//!
//! There is no deadline on an idle connection's line read, so a stalled
//! peer holds its worker slot until it closes the transport.

use std::collections::HashMap;
use std::io::BufReader;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::server::engine::AssuanServer;
use crate::server::handler::CommandRegistry;

/// A threaded server spawning one protocol engine per connection
pub struct AssuanSocketServer {
    listener: UnixListener,
    config: Arc<ServerConfig>,
    registry: Arc<CommandRegistry>,

    /// Live workers by id; lock-protected because workers terminate
    /// asynchronously while the accept loop inspects the set
    workers: Mutex<HashMap<u64, JoinHandle<()>>>,

    /// Completion channel: each worker sends its id when its engine returns
    finished_tx: Sender<u64>,
    finished_rx: Receiver<u64>,

    next_worker_id: AtomicU64,
    shutdown: AtomicBool,
}

impl AssuanSocketServer {
    /// Bind a listening socket at `path`
    pub fn bind(
        path: impl AsRef<Path>,
        config: ServerConfig,
        registry: CommandRegistry,
    ) -> Result<Self> {
        let listener = UnixListener::bind(path.as_ref())?;
        let (finished_tx, finished_rx) = unbounded();
        Ok(Self {
            listener,
            config: Arc::new(config),
            registry: Arc::new(registry),
            workers: Mutex::new(HashMap::new()),
            finished_tx,
            finished_rx,
            next_worker_id: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Accept connections until the listener fails or [`shutdown`] was
    /// requested. Each accepted connection gets a fresh engine with its own
    /// session; no state is shared across connections.
    ///
    /// [`shutdown`]: AssuanSocketServer::shutdown
    pub fn run(&self) -> Result<()> {
        tracing::info!(server = %self.config.name, "listening on socket");
        loop {
            let (stream, _addr) = self.listener.accept()?;
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            self.reap_finished();

            let live = self.live_workers();
            if live >= self.config.max_connections {
                // shed load: pure transport-level drop, no error frame
                tracing::warn!(live, max = self.config.max_connections, "dropping connection");
                drop(stream);
                continue;
            }
            if let Err(e) = self.spawn_worker(stream) {
                tracing::error!("failed to spawn worker: {e}");
            }
        }
        tracing::info!(server = %self.config.name, "stopping");
        Ok(())
    }

    /// Request the accept loop to stop. Takes effect on the next accepted
    /// connection; an idle listener keeps blocking until one arrives.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Number of workers not yet reaped
    pub fn live_workers(&self) -> usize {
        self.workers.lock().len()
    }

    /// Join every worker whose engine has already returned and drop its
    /// handle. The transport closes when the worker's engine drops it.
    fn reap_finished(&self) {
        let mut workers = self.workers.lock();
        for id in self.finished_rx.try_iter() {
            if let Some(handle) = workers.remove(&id) {
                if handle.join().is_err() {
                    tracing::error!(worker = id, "worker panicked");
                } else {
                    tracing::debug!(worker = id, "reaped worker");
                }
            }
        }
    }

    fn spawn_worker(&self, stream: UnixStream) -> Result<()> {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let config = Arc::clone(&self.config);
        let registry = Arc::clone(&self.registry);
        let finished = self.finished_tx.clone();

        let reader = BufReader::new(stream.try_clone()?);
        let writer = stream;

        let handle = thread::Builder::new()
            .name(format!("assuan-worker-{id}"))
            .spawn(move || {
                let mut engine = AssuanServer::new(config, registry, reader, writer)
                    .with_peer(format!("worker-{id}"));
                if let Err(e) = engine.run() {
                    tracing::warn!(worker = id, "connection failed: {e}");
                }
                let _ = finished.send(id);
            })?;

        self.workers.lock().insert(id, handle);
        tracing::debug!(worker = id, "spawned worker");
        Ok(())
    }
}
