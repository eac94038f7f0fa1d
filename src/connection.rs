use std::fmt;
use std::time::Duration;

use futures::future::poll_fn;

use crate::engine::{Engine, Event};
use crate::error::NotConnected;
use crate::parse::Line;


/// State of the connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No timer armed and no socket
    Idle,
    /// Retry timer is armed
    AwaitingConnect,
    /// Resolving the host and connecting
    Connecting,
    /// Socket is open, `send` works
    Connected,
}

/// Delay slot used for the next scheduled attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    Immediate,
    Interval,
}

/// Observer of connection lifecycle
///
/// Both methods do nothing by default. The handler is temporarily detached
/// while it runs, so calling `disconnect()` from within `on_connect` will
/// not call `on_disconnect` of the same handler.
pub trait Handler<E: Engine> {
    /// Connection is established, metrics can be sent now
    fn on_connect(&mut self, _conn: &mut Connection<E>) {}
    /// An established connection ended or `disconnect()` was called
    ///
    /// Called once per session: not called when a connection attempt
    /// fails, nor by `disconnect()` while waiting for a retry.
    fn on_disconnect(&mut self, _conn: &mut Connection<E>) {}
}

/// A `Handler` made of two closures
///
/// Whatever the closures capture serves as the user context.
pub struct Callbacks<C, D> {
    on_connect: C,
    on_disconnect: D,
}

/// A single outbound graphite connection with automatic reconnect
///
/// The connection goes through `Idle → AwaitingConnect → Connecting →
/// Connected`. On an error or when the peer closes the socket it goes back
/// to `AwaitingConnect`: the first retry after a successful connection
/// is immediate, all later ones wait for the retry interval, until the
/// next success.
///
/// **Abandoned attempts.** If the engine refuses to even start a connection
/// attempt (`Engine::open` returns an error) the connection goes to
/// `Idle` and no retry is scheduled. Only another `connect()` call
/// recovers from that.
pub struct Connection<E: Engine> {
    host: String,
    port: u16,
    engine: E,
    state: State,
    interval: Duration,
    backoff: Backoff,
    bytes_tx: u64,
    metrics_tx: u64,
    handler: Option<Box<dyn Handler<E> + Send>>,
}

impl<C, D> Callbacks<C, D> {
    /// Combine `on_connect` and `on_disconnect` closures
    pub fn new(on_connect: C, on_disconnect: D) -> Callbacks<C, D> {
        Callbacks { on_connect, on_disconnect }
    }
}

impl<E, C, D> Handler<E> for Callbacks<C, D>
    where E: Engine,
          C: FnMut(&mut Connection<E>),
          D: FnMut(&mut Connection<E>),
{
    fn on_connect(&mut self, conn: &mut Connection<E>) {
        (self.on_connect)(conn)
    }
    fn on_disconnect(&mut self, conn: &mut Connection<E>) {
        (self.on_disconnect)(conn)
    }
}

impl<E: Engine> Connection<E> {
    /// Create a connection in the `Idle` state
    ///
    /// Nothing happens until `connect()` is called.
    pub fn new(host: &str, port: u16, retry_interval: Duration, engine: E)
        -> Connection<E>
    {
        Connection {
            host: host.to_string(),
            port: port,
            engine: engine,
            state: State::Idle,
            interval: retry_interval,
            backoff: Backoff::Immediate,
            bytes_tx: 0,
            metrics_tx: 0,
            handler: None,
        }
    }

    /// Set the lifecycle observer, replacing the previous one
    pub fn set_handler<H>(&mut self, handler: H)
        where H: Handler<E> + Send + 'static
    {
        self.handler = Some(Box::new(handler));
    }

    /// Set lifecycle callbacks as two closures
    pub fn set_callbacks<C, D>(&mut self, on_connect: C, on_disconnect: D)
        where C: FnMut(&mut Connection<E>) + Send + 'static,
              D: FnMut(&mut Connection<E>) + Send + 'static,
    {
        self.set_handler(Callbacks::new(on_connect, on_disconnect));
    }

    /// Start connecting
    ///
    /// Only works in the `Idle` state. The first attempt is made
    /// immediately, if it fails the next one waits for the retry interval.
    pub fn connect(&mut self) {
        if self.state != State::Idle {
            debug!("Connect to {}:{} requested in state {:?}, ignoring",
                self.host, self.port, self.state);
            return;
        }
        self.engine.arm_timer(Duration::new(0, 0));
        self.backoff = Backoff::Interval;
        self.state = State::AwaitingConnect;
    }

    /// Process a single event reported by the engine
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Timer => self.attempt(),
            Event::Connected => {
                if self.state != State::Connecting {
                    trace!("Stale connect event for {}:{}",
                        self.host, self.port);
                    return;
                }
                debug!("Connected to {}:{}", self.host, self.port);
                self.state = State::Connected;
                self.backoff = Backoff::Immediate;
                self.notify(true);
            }
            Event::Error(e) => {
                if !self.is_live() {
                    trace!("Stale error for {}:{}: {}",
                        self.host, self.port, e);
                    return;
                }
                debug!("Connection to {}:{} failed: {}",
                    self.host, self.port, e);
                // a failed attempt is silent, a live session is reported
                let was_connected = self.state == State::Connected;
                self.reconnect(was_connected);
            }
            Event::Eof => {
                if !self.is_live() {
                    return;
                }
                debug!("Connection to {}:{} closed by peer",
                    self.host, self.port);
                self.reconnect(true);
            }
            Event::Flushed(bytes) => {
                self.bytes_tx += bytes as u64;
            }
        }
    }

    /// Wait for the next event from the engine and process it
    ///
    /// Returns the state after the event is processed. The returned future
    /// can be dropped at any time without loosing events. In the `Idle`
    /// state there is nothing to wait for, so it never resolves.
    pub async fn turn(&mut self) -> State {
        let event = {
            let engine = &mut self.engine;
            poll_fn(|cx| engine.poll_event(cx)).await
        };
        self.handle(event);
        self.state
    }

    /// Send a metric
    ///
    /// Fields are written as is, validate them with `parse` or
    /// `validate_key` when they come from untrusted input. Metrics are
    /// counted when queued, not when flushed.
    pub fn send(&mut self, metric: &str, value: &str, timestamp: &str)
        -> Result<(), NotConnected>
    {
        let mut buf = Vec::with_capacity(
            metric.len() + value.len() + timestamp.len() + 3);
        buf.extend_from_slice(metric.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(value.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(timestamp.as_bytes());
        buf.push(b'\n');
        self.send_formatted(&buf)
    }

    /// Send an already parsed line
    pub fn send_line(&mut self, line: &Line) -> Result<(), NotConnected> {
        self.send(line.metric, line.value, line.timestamp)
    }

    pub(crate) fn send_formatted(&mut self, data: &[u8])
        -> Result<(), NotConnected>
    {
        if self.state != State::Connected {
            return Err(NotConnected);
        }
        self.engine.write(data);
        self.metrics_tx += 1;
        Ok(())
    }

    /// Close the connection and stop reconnecting
    ///
    /// Goes to the `Idle` state. When connecting or connected, drops the
    /// socket and calls `on_disconnect`. When waiting for a retry, disarms
    /// the timer without calling it: the previous session end (if there
    /// was a session) has been reported already. Does nothing when `Idle`.
    pub fn disconnect(&mut self) {
        let report = match self.state {
            State::Idle => return,
            State::AwaitingConnect => {
                self.engine.cancel_timer();
                false
            }
            State::Connecting | State::Connected => {
                self.engine.close();
                true
            }
        };
        debug!("Disconnected from {}:{}", self.host, self.port);
        self.state = State::Idle;
        if report {
            self.notify(false);
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns true if `send` would queue a metric
    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// Host name this connection connects to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port this connection connects to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Delay between failed attempts
    pub fn retry_interval(&self) -> Duration {
        self.interval
    }

    /// Total bytes flushed to the network
    pub fn bytes_transmitted(&self) -> u64 {
        self.bytes_tx
    }

    /// Total metrics queued by `send`
    pub fn metrics_transmitted(&self) -> u64 {
        self.metrics_tx
    }

    /// Bytes queued but not flushed yet
    pub fn buffered(&self) -> usize {
        self.engine.buffered()
    }

    /// The underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn is_live(&self) -> bool {
        self.state == State::Connecting || self.state == State::Connected
    }

    fn delay(&self) -> Duration {
        match self.backoff {
            Backoff::Immediate => Duration::new(0, 0),
            Backoff::Interval => self.interval,
        }
    }

    fn attempt(&mut self) {
        if self.state != State::AwaitingConnect {
            trace!("Stale timer for {}:{}", self.host, self.port);
            return;
        }
        trace!("Connecting to {}:{}", self.host, self.port);
        self.state = State::Connecting;
        if let Err(e) = self.engine.open(&self.host, self.port) {
            // no retry is scheduled here, only `connect()` recovers
            debug!("Can't start connecting to {}:{}: {}",
                self.host, self.port, e);
            self.engine.close();
            self.state = State::Idle;
        }
    }

    fn reconnect(&mut self, report: bool) {
        self.engine.close();
        self.state = State::AwaitingConnect;
        let delay = self.delay();
        self.engine.arm_timer(delay);
        if self.backoff == Backoff::Immediate {
            self.backoff = Backoff::Interval;
        }
        if report {
            self.notify(false);
        }
    }

    fn notify(&mut self, connected: bool) {
        if let Some(mut handler) = self.handler.take() {
            if connected {
                handler.on_connect(self);
            } else {
                handler.on_disconnect(self);
            }
            // the callback may have installed a new handler
            if self.handler.is_none() {
                self.handler = Some(handler);
            }
        }
    }
}

impl<E: Engine> fmt::Debug for Connection<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Connection({}:{}, {:?}, {} metrics, {} bytes)",
            self.host, self.port, self.state,
            self.metrics_tx, self.bytes_tx)
    }
}
