extern crate env_logger;
extern crate tk_graphite;
extern crate tokio;

use std::env::args;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tk_graphite::{parse, Connection, TokioEngine, DEFAULT_PORT};


#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let host = args().skip(1).next().unwrap_or("localhost".to_string());
    let mut conn = Connection::new(&host, DEFAULT_PORT,
        Duration::from_secs(5), TokioEngine::new());
    conn.set_callbacks(
        |c| println!("Connected to {}:{}", c.host(), c.port()),
        |c| println!("Disconnected from {}:{}", c.host(), c.port()));
    conn.connect();
    println!("Enter `metric.name 134 1500000000`:");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = conn.turn() => {}
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    _ => break,
                };
                match parse(&line, None) {
                    Ok(metric) => {
                        if conn.send_line(&metric).is_err() {
                            println!("Not connected, {} dropped", metric);
                        }
                    }
                    Err(e) => println!("Invalid line: {}", e),
                }
            }
        }
    }
    conn.disconnect();
    println!("Sent {} metrics, {} bytes",
        conn.metrics_transmitted(), conn.bytes_transmitted());
}
