use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::runtime;
use tokio::time::{sleep_until, Instant, Sleep};

use crate::engine::{Engine, Event};


type Connecting = Pin<Box<dyn Future<Output=io::Result<TcpStream>> + Send>>;

/// Engine running on the current tokio runtime
///
/// Host names are resolved by tokio (on a blocking thread pool) and all
/// resolved addresses are tried in order. Anything the peer sends is read
/// and discarded.
pub struct TokioEngine {
    deadline: Option<Instant>,
    timer: Option<Pin<Box<Sleep>>>,
    connecting: Option<Connecting>,
    stream: Option<TcpStream>,
    out_buf: BytesMut,
}

impl TokioEngine {
    /// Create an engine, no runtime is required until it's polled
    pub fn new() -> TokioEngine {
        TokioEngine {
            deadline: None,
            timer: None,
            connecting: None,
            stream: None,
            out_buf: BytesMut::new(),
        }
    }

    fn poll_connecting(&mut self, cx: &mut Context) -> Poll<Event> {
        let result = match self.connecting.as_mut() {
            Some(fut) => match fut.as_mut().poll(cx) {
                Poll::Ready(result) => result,
                Poll::Pending => return Poll::Pending,
            },
            None => return Poll::Pending,
        };
        self.connecting = None;
        match result {
            Ok(sock) => {
                if let Err(e) = sock.set_nodelay(true) {
                    debug!("Can't set TCP_NODELAY: {}", e);
                }
                self.stream = Some(sock);
                Poll::Ready(Event::Connected)
            }
            Err(e) => Poll::Ready(Event::Error(e)),
        }
    }

    fn poll_stream(&mut self, cx: &mut Context) -> Poll<Event> {
        let sock = match self.stream.as_mut() {
            Some(sock) => sock,
            None => return Poll::Pending,
        };
        if !self.out_buf.is_empty() {
            match Pin::new(&mut *sock).poll_write(cx, &self.out_buf[..]) {
                Poll::Ready(Ok(0)) => {
                    return Poll::Ready(Event::Error(
                        io::ErrorKind::WriteZero.into()));
                }
                Poll::Ready(Ok(bytes)) => {
                    self.out_buf.advance(bytes);
                    return Poll::Ready(Event::Flushed(bytes));
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Event::Error(e)),
                Poll::Pending => {}
            }
        }
        // carbon never sends anything, just drain the input
        let mut scratch = [0u8; 1024];
        loop {
            let mut buf = ReadBuf::new(&mut scratch);
            match Pin::new(&mut *sock).poll_read(cx, &mut buf) {
                Poll::Ready(Ok(())) if buf.filled().is_empty() => {
                    return Poll::Ready(Event::Eof);
                }
                Poll::Ready(Ok(())) => {
                    trace!("Discarded {} bytes of input", buf.filled().len());
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Event::Error(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    fn poll_timer(&mut self, cx: &mut Context) -> Poll<Event> {
        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => return Poll::Pending,
        };
        let timer = self.timer
            .get_or_insert_with(|| Box::pin(sleep_until(deadline)));
        match timer.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.deadline = None;
                self.timer = None;
                Poll::Ready(Event::Timer)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Engine for TokioEngine {
    fn arm_timer(&mut self, delay: Duration) {
        // the sleep future is created on poll, where the runtime is known
        self.deadline = Some(Instant::now() + delay);
        self.timer = None;
    }

    fn cancel_timer(&mut self) {
        self.deadline = None;
        self.timer = None;
    }

    fn open(&mut self, host: &str, port: u16) -> io::Result<()> {
        if runtime::Handle::try_current().is_err() {
            return Err(io::Error::new(io::ErrorKind::Other,
                "no tokio runtime to connect from"));
        }
        self.close();
        let host = host.to_string();
        self.connecting = Some(Box::pin(async move {
            TcpStream::connect((host.as_str(), port)).await
        }));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) {
        if self.stream.is_none() {
            trace!("Dropping {} bytes, no connection", data.len());
            return;
        }
        self.out_buf.extend_from_slice(data);
    }

    fn close(&mut self) {
        self.connecting = None;
        self.stream = None;
        self.out_buf.clear();
    }

    fn buffered(&self) -> usize {
        self.out_buf.len()
    }

    fn poll_event(&mut self, cx: &mut Context) -> Poll<Event> {
        if let Poll::Ready(ev) = self.poll_connecting(cx) {
            return Poll::Ready(ev);
        }
        if let Poll::Ready(ev) = self.poll_stream(cx) {
            return Poll::Ready(ev);
        }
        self.poll_timer(cx)
    }
}

impl Default for TokioEngine {
    fn default() -> TokioEngine {
        TokioEngine::new()
    }
}

impl fmt::Debug for TokioEngine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokioEngine")
            .field("timer_armed", &self.deadline.is_some())
            .field("connecting", &self.connecting.is_some())
            .field("connected", &self.stream.is_some())
            .field("buffered", &self.out_buf.len())
            .finish()
    }
}
