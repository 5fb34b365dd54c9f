//! TCP line server.
//!
//! Each connection gets a reader loop and a writer task fed through an
//! unbounded channel, so informs emitted while a capture blocks reach the
//! client immediately. Camera commands run on the blocking pool, one at a
//! time across all connections; `ping` and `status` are answered without
//! waiting for the camera.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

use crate::camera::{CameraDriver, CameraState};
use crate::command::{
    ping, report_status, Command, CommandDispatcher, Reply, Request, Responder,
};
use crate::error::FvcError;

/// Sends the replies of one command to a connection's writer task.
struct LineResponder {
    id: u32,
    tx: mpsc::UnboundedSender<String>,
}

impl Responder for LineResponder {
    fn send(&mut self, reply: Reply) {
        // A closed channel means the client went away; the command still completes
        let _ = self.tx.send(reply.line(self.id));
    }
}

/// Holds back the final reply until the camera has been released, so a
/// client that sees `:` or `f` can immediately send its next command.
struct DeferFinal<R: Responder> {
    inner: R,
    held: Option<Reply>,
}

impl<R: Responder> DeferFinal<R> {
    fn new(inner: R) -> Self {
        Self { inner, held: None }
    }

    fn flush(mut self) {
        if let Some(reply) = self.held.take() {
            self.inner.send(reply);
        }
    }
}

impl<R: Responder> Responder for DeferFinal<R> {
    fn send(&mut self, reply: Reply) {
        if reply.code.is_final() {
            self.held = Some(reply);
        } else {
            self.inner.send(reply);
        }
    }
}

/// Clears the busy flag when the camera command finishes, even on panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Shared actor state: the dispatcher behind a mutex plus the busy flag
/// admitting a single in-flight camera command.
pub struct Actor<D: CameraDriver> {
    dispatcher: Mutex<CommandDispatcher<D>>,
    /// Camera state as of the last finished camera command
    snapshot: Mutex<Option<CameraState>>,
    busy: Arc<AtomicBool>,
}

impl<D: CameraDriver + 'static> Actor<D> {
    pub fn new(dispatcher: CommandDispatcher<D>) -> Self {
        let snapshot = dispatcher.snapshot();
        Self {
            dispatcher: Mutex::new(dispatcher),
            snapshot: Mutex::new(snapshot),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.busy)))
    }

    /// Handle one request line, sending replies to `tx`. Camera commands are
    /// started on the blocking pool and this returns without waiting for them.
    pub async fn handle_line(self: &Arc<Self>, line: &str, tx: mpsc::UnboundedSender<String>) {
        let request = Request::parse(line);
        let mut out = LineResponder { id: request.id, tx };
        let command = match request.command {
            Ok(command) => command,
            Err(e) => {
                log::warn!("Rejected request '{}': {}", line.trim(), e);
                out.send(Reply::fail_with(&e));
                return;
            }
        };
        log::info!("Command {}: {}", request.id, line.trim());

        if !command.uses_camera() {
            match command {
                Command::Status => self.status(&mut out).await,
                _ => ping(&mut out),
            }
            return;
        }

        let Some(guard) = self.try_acquire() else {
            log::warn!("Refusing {} while another command runs", command.verb());
            out.send(Reply::fail_with(&FvcError::Busy));
            return;
        };
        let actor = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut out = DeferFinal::new(out);
            {
                let _guard = guard;
                let mut dispatcher = actor.dispatcher.blocking_lock();
                dispatcher.dispatch(&command, &mut out);
                *actor.snapshot.blocking_lock() = dispatcher.snapshot();
            }
            out.flush();
        });
    }

    /// Live status when the camera is idle, otherwise the last snapshot.
    async fn status(&self, out: &mut LineResponder) {
        if !self.is_busy() {
            if let Ok(dispatcher) = self.dispatcher.try_lock() {
                report_status(dispatcher.controller().state(), false, out);
                return;
            }
        }
        let snapshot = self.snapshot.lock().await.clone();
        report_status(snapshot.as_ref(), true, out);
    }

    /// Connect the camera before serving; a failure is logged and left for
    /// a later `reconnect`.
    pub async fn connect(&self) {
        let mut dispatcher = self.dispatcher.lock().await;
        match dispatcher.connect() {
            Ok(state) => {
                *self.snapshot.lock().await = Some(state);
            }
            Err(e) => log::error!("Camera connect failed: {}", e),
        }
    }

    /// Release the camera. Waits for an in-flight command to finish.
    pub async fn close(&self) {
        let mut dispatcher = self.dispatcher.lock().await;
        if let Err(e) = dispatcher.close() {
            log::warn!("Closing camera failed: {}", e);
        }
        *self.snapshot.lock().await = None;
    }
}

/// Accept connections on `listener` until `shutdown` resolves.
pub async fn serve<D, F>(listener: TcpListener, actor: Arc<Actor<D>>, shutdown: F) -> std::io::Result<()>
where
    D: CameraDriver + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown requested, no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        log::warn!("Accept failed: {}", e);
                        continue;
                    }
                };
                log::info!("Client connected: {}", peer);
                let actor = Arc::clone(&actor);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, actor).await {
                        log::warn!("Connection {} ended with error: {}", peer, e);
                    }
                    log::info!("Client disconnected: {}", peer);
                });
            }
        }
    }
}

/// Bind `addr`, serve until Ctrl-C, then close the camera.
pub async fn run<D: CameraDriver + 'static>(addr: &str, actor: Arc<Actor<D>>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    serve(listener, Arc::clone(&actor), shutdown).await?;
    actor.close().await;
    Ok(())
}

async fn handle_connection<D: CameraDriver + 'static>(
    stream: TcpStream,
    actor: Arc<Actor<D>>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            write_half.write_all(line.as_bytes()).await?;
            write_half.write_all(b"\n").await?;
        }
        write_half.shutdown().await
    });

    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        actor.handle_line(&line, tx.clone()).await;
    }

    // Commands still running hold their own sender; the writer drains them
    drop(tx);
    writer.await.map_err(std::io::Error::other)?
}
