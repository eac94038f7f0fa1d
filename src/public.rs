use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use num_traits::Num;

use crate::channel::{channel, Receiver, Sender};
use crate::connection::Connection;
use crate::element::Metric;
use crate::error::{Field, ParseError};
use crate::parse::{parse, validate_key};
use crate::tokio_engine::TokioEngine;
use crate::Config;

/// A structure that is used to submit values to carbon
///
/// Internally it uses a state machine to communicate to the underlying
/// network connection. Metrics submitted while there is no connection
/// are dropped.
#[derive(Clone)]
pub struct Carbon {
    chan: Sender,
}

/// The receiving half of the `Carbon` channel
///
/// Turn it into a connection with `connect_to`.
pub struct Init {
    chan: Receiver,
    config: Arc<Config>,
}

impl Carbon {
    /// This creates an instance of the Carbon public interface and `Init`
    /// structure that can be used to establish a connection
    pub fn new(config: &Arc<Config>) -> (Carbon, Init) {
        let (tx, rx) = channel(config.max_metrics_buffered);
        return (
            Carbon {
                chan: tx,
            },
            Init {
                chan: rx,
                config: config.clone(),
            }
        )
    }
    /// Add any numeric value for carbon with current timestamp
    ///
    /// # Example
    ///
    /// ```ignore
    /// carbon.add_value("my.metric", 1)?;
    /// carbon.add_value(
    ///     format_args!("metrics.{host}.cpu", host),
    ///     27)?;
    /// ```
    ///
    /// # Errors
    ///
    /// When formatted name or value doesn't match the plaintext grammar
    /// (for example name contains a whitespace or value is `NaN`).
    pub fn add_value<N, V>(&self, name: N, value: V)
        -> Result<(), ParseError>
        where N: Display, V: Num + Display
    {
        self.add_value_at(name, value, SystemTime::now())
    }

    /// Add any numeric value for carbon with specific timestamp
    ///
    /// # Example
    ///
    /// ```ignore
    /// let timestamp = SystemTime::now();
    /// carbon.add_value_at("my.metric", 1, timestamp)?;
    /// carbon.add_value_at(
    ///     format_args!("metrics.{host}.cpu", host),
    ///     27, timestamp)?;
    /// ```
    ///
    /// Timestamps before the unix epoch are sent as zero.
    ///
    /// # Errors
    ///
    /// When formatted name or value doesn't match the plaintext grammar
    /// (for example name contains a whitespace or value is `NaN`).
    pub fn add_value_at<N, V>(&self, name: N, value: V, ts: SystemTime)
        -> Result<(), ParseError>
        where N: Display, V: Num + Display
    {
        let tm = ts.duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let name = name.to_string();
        validate_key(&name)?;
        let value = value.to_string();
        let line = format!("{} {} {}", name, value, tm);
        if parse(&line, None)?.value != value {
            // value with a space inside
            return Err(ParseError::Empty(Field::Value));
        }
        self.send(&line);
        Ok(())
    }

    /// Add a raw `metric value timestamp` line
    ///
    /// Useful for relaying lines received from elsewhere. The line is
    /// validated and re-emitted with single spaces. Trailing characters
    /// after the timestamp (like `\r`) are dropped.
    pub fn add_line(&self, line: &str) -> Result<(), ParseError> {
        let parsed = parse(line, None)?;
        self.send(&parsed.to_string());
        Ok(())
    }

    fn send(&self, line: &str) {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.chan.send(Metric(buf));
    }
}

impl Init {
    /// Connect to a carbon host and forward metrics to it
    ///
    /// The returned future should be spawned on a tokio runtime. It
    /// reconnects as configured and resolves when all references to API
    /// (`Carbon` structure) are dropped and buffered bytes are flushed.
    pub fn connect_to(self, host: &str, port: u16)
        -> impl Future<Output=()> + Send
    {
        let Init { chan, config } = self;
        let conn = Connection::new(host, port,
            config.reconnect_delay, TokioEngine::new());
        run(conn, chan, config)
    }
}

async fn run(mut conn: Connection<TokioEngine>, mut chan: Receiver,
    config: Arc<Config>)
{
    conn.connect();
    loop {
        if chan.is_done() {
            if !conn.is_connected() || conn.buffered() == 0 {
                break;
            }
        }
        let pull = !chan.is_done() &&
            conn.buffered() < config.output_watermark;
        tokio::select! {
            _ = conn.turn() => {}
            metric = chan.next(), if pull => match metric {
                Some(metric) => forward(&mut conn, metric),
                None => debug!("All carbon handles are dropped"),
            },
        }
    }
    conn.disconnect();
    debug!("Carbon connection finished: {:?}", conn);
}

fn forward(conn: &mut Connection<TokioEngine>, metric: Metric) {
    if conn.send_formatted(&metric.0).is_err() {
        trace!("Dropping metric {}, not connected",
            String::from_utf8_lossy(&metric.0).trim_end());
    }
}

impl fmt::Debug for Carbon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (a, b) = self.chan.buffered();
        write!(f, "Carbon({}/{})", a, b)
    }
}

impl fmt::Debug for Init {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Init")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, UNIX_EPOCH};

    use futures::StreamExt;
    use futures::executor::block_on;

    use super::Carbon;
    use crate::error::{Field, ParseError};
    use crate::Config;

    fn next_line(init: &mut super::Init) -> String {
        let metric = block_on(init.chan.next()).unwrap();
        String::from_utf8(metric.0).unwrap()
    }

    #[test]
    fn add_value_at() {
        let (carbon, mut init) = Carbon::new(&Config::new().done());
        let ts = UNIX_EPOCH + Duration::from_secs(1000);
        carbon.add_value_at("cpu.load", 0.5, ts).unwrap();
        carbon.add_value_at(format_args!("hosts.{}.up", "web1"), -1, ts)
            .unwrap();
        assert_eq!(next_line(&mut init), "cpu.load 0.5 1000\n");
        assert_eq!(next_line(&mut init), "hosts.web1.up -1 1000\n");
    }

    #[test]
    fn invalid_values() {
        let (carbon, _init) = Carbon::new(&Config::new().done());
        assert_eq!(carbon.add_value("with space", 1),
                   Err(ParseError::InvalidKey));
        assert_eq!(carbon.add_value("x", std::f64::NAN),
                   Err(ParseError::Empty(Field::Value)));
        assert_eq!(carbon.add_value("x\r", 1),
                   Err(ParseError::InvalidKey));
        assert_eq!(carbon.add_value("", 1),
                   Err(ParseError::Empty(Field::Metric)));
        assert_eq!(format!("{:?}", carbon), "Carbon(0/10000)");
    }

    #[test]
    fn add_line() {
        let (carbon, mut init) = Carbon::new(&Config::new().done());
        carbon.add_line("a.b   1.5  1000\r").unwrap();
        assert_eq!(carbon.add_line("a.b 1.5"),
                   Err(ParseError::NoSeparator(Field::Value)));
        assert_eq!(next_line(&mut init), "a.b 1.5 1000\n");
        assert_eq!(format!("{:?}", carbon), "Carbon(0/10000)");
    }
}
