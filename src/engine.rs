use std::io;
use std::task::{Context, Poll};
use std::time::Duration;


/// Event reported by an `Engine` to the `Connection` that owns it
#[derive(Debug)]
pub enum Event {
    /// Retry timer fired
    Timer,
    /// Connection attempt succeeded
    Connected,
    /// Resolution, connection or socket error
    Error(io::Error),
    /// Peer closed the connection
    Eof,
    /// This many bytes left the output buffer
    Flushed(usize),
}

/// Asynchronous I/O used by a single `Connection`
///
/// None of the methods may block. Results of the actions are reported
/// later by `poll_event`, one event at a time.
pub trait Engine {
    /// Schedule `Event::Timer` after `delay`, replacing the armed timer
    fn arm_timer(&mut self, delay: Duration);
    /// Disarm the timer if it's armed
    fn cancel_timer(&mut self);
    /// Start resolving `host` and connecting to it
    ///
    /// Returns an error only when the attempt can't be started at all,
    /// failures of the attempt itself come as `Event::Error`.
    fn open(&mut self, host: &str, port: u16) -> io::Result<()>;
    /// Queue bytes on the output stream of the open socket
    fn write(&mut self, data: &[u8]);
    /// Drop the socket (or the connection attempt) and its output buffer
    fn close(&mut self);
    /// Number of bytes queued but not flushed yet
    fn buffered(&self) -> usize;
    /// Poll for the next event
    fn poll_event(&mut self, cx: &mut Context) -> Poll<Event>;
}
