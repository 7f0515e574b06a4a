//! SMTP server implementation

use crate::smtp::config::ServerConfig;
use crate::smtp::connection::Connection;
use crate::smtp::email::Email;
use crate::smtp::error::SmtpError;
use crate::smtp::handler::SessionHandler;
use crate::smtp::store::{MailStore, NullMailStore};

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::Duration;
use threadpool::ThreadPool;

/// Polling interval for readiness and message-count waits
const TICK: Duration = Duration::from_millis(1);

/// Listen backlog for the server socket
const BACKLOG: i32 = 128;

/// SMTP server that accepts connections and dispatches each one to a
/// session handler backed by a shared mail store.
///
/// The accept loop runs on whatever thread calls [`run`](Self::run); control
/// methods are safe to call from any other thread. [`RunningServer`] wraps
/// the usual start-on-a-background-thread arrangement.
pub struct SmtpServer {
    hostname: String,
    config: ServerConfig,
    stopped: AtomicBool,
    ready: AtomicBool,
    threaded: AtomicBool,
    num_threads: AtomicUsize,
    store: RwLock<Arc<dyn MailStore>>,
    listener: Mutex<Option<Socket>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl SmtpServer {
    /// Create a new SMTP server.
    ///
    /// The server starts in the stopped state with a [`NullMailStore`], so it
    /// is safe to run before any store is configured.
    pub fn new(hostname: &str, config: ServerConfig) -> Self {
        Self {
            hostname: hostname.to_owned(),
            num_threads: AtomicUsize::new(config.num_threads()),
            config,
            stopped: AtomicBool::new(true),
            ready: AtomicBool::new(false),
            threaded: AtomicBool::new(false),
            store: RwLock::new(Arc::new(NullMailStore)),
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// True while the accept loop is blocked waiting for a connection.
    ///
    /// Controllers poll this after spawning [`run`](Self::run) to avoid
    /// racing connection attempts against a not-yet-listening server.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// True when the server has not started or has been told to stop
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Handle sessions concurrently instead of one at a time.
    ///
    /// Latched when the accept loop starts; changing it mid-run has no
    /// effect until the next run.
    pub fn set_threaded(&self, threaded: bool) {
        self.threaded.store(threaded, Ordering::SeqCst);
    }

    pub fn is_threaded(&self) -> bool {
        self.threaded.load(Ordering::SeqCst)
    }

    /// Request a worker count for threaded mode.
    ///
    /// Takes effect at the next run's pool-sizing read, clamped to the
    /// configured ceiling. A pool that is already running never resizes.
    pub fn set_num_threads(&self, num_threads: usize) {
        self.num_threads.store(num_threads, Ordering::SeqCst);
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads.load(Ordering::SeqCst)
    }

    /// Replace the mail store.
    ///
    /// The swap is pointer-atomic only: sessions already running keep
    /// writing to the store they started with.
    pub fn set_mail_store(&self, store: Arc<dyn MailStore>) {
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = store;
    }

    fn mail_store(&self) -> Arc<dyn MailStore> {
        Arc::clone(&self.store.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Address the server is listening on, while bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// All captured messages (delegates to the mail store)
    pub fn messages(&self) -> Vec<Email> {
        self.mail_store().messages()
    }

    /// A single captured message, `None` when out of range
    pub fn message(&self, index: usize) -> Option<Email> {
        self.mail_store().message(index)
    }

    /// Number of captured messages
    pub fn email_count(&self) -> usize {
        self.mail_store().email_count()
    }

    /// Discard all captured messages
    pub fn clear_messages(&self) {
        self.mail_store().clear_messages();
    }

    /// Wait until at least `target` messages are captured.
    ///
    /// Polls the store once per 1 ms tick for at most `max_ticks` ticks and
    /// returns either way; the budget is the hard bound.
    pub fn anticipate_message_count(&self, target: usize, max_ticks: usize) {
        let mut remaining = max_ticks;
        while self.email_count() < target && remaining > 0 {
            remaining -= 1;
            thread::sleep(TICK);
        }
    }

    /// Run the accept loop on the calling thread until stopped.
    ///
    /// Binds the listening socket, then accepts and dispatches connections
    /// until [`stop`](Self::stop) is called. Setup failures are returned;
    /// either way the server settles back to stopped and not ready, and the
    /// socket is released, before returning. Must not be called twice
    /// concurrently; a stopped server may be run again.
    pub fn run(&self) -> Result<(), SmtpError> {
        self.stopped.store(false, Ordering::SeqCst);

        let result = self.bind().map(|listener| self.serve(&listener));

        self.stopped.store(true, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        self.release_listener();
        result
    }

    /// Ask the server to stop and unblock a pending accept.
    ///
    /// Callable from any thread, any number of times. Does not wait for
    /// in-flight sessions; stopping means no new work, not drain.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);

        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(socket) = handle {
            let _ = socket.shutdown(std::net::Shutdown::Both);
        }
    }

    fn bind(&self) -> Result<TcpListener, SmtpError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.config.port()));

        let socket =
            Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(SmtpError::Bind)?;
        socket.set_reuse_address(true).map_err(SmtpError::Bind)?;
        socket.bind(&addr.into()).map_err(SmtpError::Bind)?;
        socket.listen(BACKLOG).map_err(SmtpError::Bind)?;
        // Bounds each accept call so the loop can observe a stop request
        socket
            .set_read_timeout(Some(self.config.socket_timeout()))
            .map_err(SmtpError::Bind)?;

        let bound = socket.local_addr().ok().and_then(|a| a.as_socket());
        *self
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = bound;

        // A clone of the socket lets stop() shut down a blocked accept
        let shutdown_handle = socket.try_clone().map_err(SmtpError::Bind)?;
        *self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(shutdown_handle);

        if let Some(addr) = bound {
            log::info!("listening on {addr}");
        }
        Ok(socket.into())
    }

    fn serve(&self, listener: &TcpListener) {
        let pool_size = if self.threaded.load(Ordering::SeqCst) {
            self.config
                .clamp_threads(self.num_threads.load(Ordering::SeqCst))
        } else {
            1
        };
        let pool = ThreadPool::new(pool_size);
        log::debug!("serving with {pool_size} worker(s)");

        while let Some(stream) = self.next_client(listener) {
            let store = self.mail_store();
            match Connection::new(stream) {
                Ok(connection) => {
                    let handler = SessionHandler::new(connection, store, &self.hostname);
                    pool.execute(move || handler.run());
                }
                Err(e) => log::warn!("failed to wrap client connection: {e}"),
            }
        }

        self.ready.store(false, Ordering::SeqCst);
    }

    /// Accept the next connection, retrying timeouts and transient errors
    /// until a client arrives or the server is stopped.
    fn next_client(&self, listener: &TcpListener) -> Option<TcpStream> {
        while !self.is_stopped() {
            self.ready.store(true, Ordering::SeqCst);
            match listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("accepted connection from {peer}");
                    return Some(stream);
                }
                Err(e) if is_timeout(&e) => log::trace!("accept timed out"),
                Err(e) => log::debug!("accept failed: {e}"),
            }
        }
        None
    }

    fn release_listener(&self) {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// A server running on a background thread.
///
/// Created by [`RunningServer::start`], which returns once the server is
/// accepting connections (or with the startup error if it never gets there).
pub struct RunningServer {
    server: Arc<SmtpServer>,
    join: thread::JoinHandle<Result<(), SmtpError>>,
}

impl RunningServer {
    /// Spawn the server's accept loop on a named thread and wait for
    /// readiness. A bind failure is returned here instead of being lost on
    /// the background thread.
    pub fn start(server: Arc<SmtpServer>) -> Result<Self, SmtpError> {
        let runner = Arc::clone(&server);
        let join = thread::Builder::new()
            .name("smtp-accept".to_owned())
            .spawn(move || {
                let result = runner.run();
                if let Err(ref e) = result {
                    log::error!("server exited: {e}");
                }
                result
            })?;

        while !server.is_ready() {
            if join.is_finished() {
                return Err(match join.join() {
                    Ok(Ok(())) => {
                        SmtpError::Startup("server stopped before becoming ready".to_owned())
                    }
                    Ok(Err(e)) => e,
                    Err(_) => SmtpError::Startup("server thread panicked".to_owned()),
                });
            }
            thread::sleep(TICK);
        }

        Ok(Self { server, join })
    }

    /// Shared handle to the underlying server
    pub fn server(&self) -> &Arc<SmtpServer> {
        &self.server
    }

    /// Address the server is listening on
    pub fn addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Stop the server and wait for the accept loop to finish.
    ///
    /// In-flight sessions are not drained.
    pub fn stop(self) -> Result<(), SmtpError> {
        self.server.stop();
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(SmtpError::Startup("server thread panicked".to_owned())),
        }
    }
}

impl std::ops::Deref for RunningServer {
    type Target = SmtpServer;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::store::MemoryMailStore;
    use std::time::Instant;

    fn test_config() -> ServerConfig {
        ServerConfig::new()
            .with_port(0)
            .with_socket_timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_new_server_is_stopped() {
        let server = SmtpServer::new("test.local", test_config());

        assert!(server.is_stopped());
        assert!(!server.is_ready());
        assert!(!server.is_threaded());
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn test_default_store_is_null() {
        let server = SmtpServer::new("test.local", test_config());

        assert_eq!(server.email_count(), 0);
        assert!(server.messages().is_empty());
        assert!(server.message(0).is_none());
        server.clear_messages();
    }

    #[test]
    fn test_set_mail_store_switches_backend() {
        let server = SmtpServer::new("test.local", test_config());
        let store = Arc::new(MemoryMailStore::new());
        server.set_mail_store(Arc::clone(&store) as Arc<dyn MailStore>);

        store.add_message(Email::new(
            "a@example.com".to_string(),
            vec!["b@example.com".to_string()],
            "hi".to_string(),
        ));

        assert_eq!(server.email_count(), 1);
        assert_eq!(server.message(0).unwrap().from, "a@example.com");
    }

    #[test]
    fn test_threading_controls() {
        let server = SmtpServer::new("test.local", test_config().with_num_threads(3));

        assert!(!server.is_threaded());
        assert_eq!(server.num_threads(), 3);

        server.set_threaded(true);
        server.set_num_threads(7);
        assert!(server.is_threaded());
        assert_eq!(server.num_threads(), 7);
    }

    #[test]
    fn test_anticipate_returns_immediately_when_satisfied() {
        let server = SmtpServer::new("test.local", test_config());

        let started = Instant::now();
        server.anticipate_message_count(0, 10_000);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_anticipate_respects_tick_budget() {
        let server = SmtpServer::new("test.local", test_config());

        let started = Instant::now();
        server.anticipate_message_count(5, 20);
        // 20 ticks of 1 ms, far less than the 5 s ceiling
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(server.email_count(), 0);
    }

    #[test]
    fn test_start_and_stop() {
        let server = Arc::new(SmtpServer::new("test.local", test_config()));
        let running = RunningServer::start(Arc::clone(&server)).unwrap();

        assert!(server.is_ready());
        assert!(!server.is_stopped());
        assert!(running.addr().is_some());

        running.stop().unwrap();

        assert!(server.is_stopped());
        assert!(!server.is_ready());
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn test_start_reports_bind_failure() {
        let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let config = test_config().with_port(port);
        let server = Arc::new(SmtpServer::new("test.local", config));

        let result = RunningServer::start(Arc::clone(&server));
        assert!(matches!(result, Err(SmtpError::Bind(_))));
        assert!(server.is_stopped());
        assert!(!server.is_ready());
    }

    #[test]
    fn test_server_can_run_again_after_stop() {
        let server = Arc::new(SmtpServer::new("test.local", test_config()));

        let running = RunningServer::start(Arc::clone(&server)).unwrap();
        running.stop().unwrap();

        let running = RunningServer::start(Arc::clone(&server)).unwrap();
        assert!(server.is_ready());
        running.stop().unwrap();
    }
}
