use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService};
use std::any::Any;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const READY_TIMEOUT: Duration = Duration::from_millis(250);
const READY_POLL: Duration = Duration::from_millis(5);

/// The page server's listener, accepting up to 32 request headers.
pub struct HttpServer<T>(pub T);

/// A listening page server. Dropping the handle leaves the server running.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait until the listener accepts TCP connections, for at most 250ms.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if no connection succeeded in time.
    pub fn wait_ready(&self) -> io::Result<()> {
        self.wait_ready_within(READY_TIMEOUT)
    }

    /// Like [`ServerHandle::wait_ready`] with a caller-chosen deadline.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if no connection succeeded within `timeout`.
    pub fn wait_ready_within(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                debug!(addr = %self.addr, "HTTP server accepting connections");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("server on {} not ready after {timeout:?}", self.addr),
                ));
            }
            thread::sleep(READY_POLL);
        }
    }

    /// Cancel the accept loop and wait for it to unwind.
    pub fn stop(self) {
        info!(addr = %self.addr, "Stopping HTTP server");
        // SAFETY: cancel is unsafe only for coroutines that may still be resumed
        // elsewhere; this handle is the sole owner and is joined right after.
        unsafe {
            self.handle.coroutine().cancel();
        }
        // cancellation unwinds the coroutine, so an Err here is the normal outcome
        if let Err(payload) = self.handle.join() {
            debug!(addr = %self.addr, reason = %panic_message(payload.as_ref()), "HTTP server coroutine unwound");
        }
    }

    /// Block until the server coroutine exits.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the server coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        let addr = self.addr;
        self.handle.join().inspect_err(|payload| {
            error!(addr = %addr, reason = %panic_message(payload.as_ref()), "HTTP server coroutine panicked");
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind to the first address `addr` resolves to and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not resolve or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address did not resolve"))?;
        let handle = HttpServerWithHeaders::<_, 32>(self.0).start(addr)?;
        info!(addr = %addr, "HTTP server listening");
        Ok(ServerHandle { addr, handle })
    }
}
