extern crate env_logger;
extern crate tk_graphite;
extern crate tokio;

use std::env::args;
use std::io::{self, BufRead};
use std::thread;

use tk_graphite::{Carbon, Config, DEFAULT_PORT};


fn main() {
    env_logger::init();
    let host = args().skip(1).next().unwrap_or("localhost".to_string());
    let (carbon, init) = Carbon::new(&Config::new().done());
    // stdin is read by a blocking loop, io runs in its own thread
    let io = thread::spawn(move || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime")
            .block_on(init.connect_to(&host, DEFAULT_PORT))
    });
    println!("Enter `metric.name 134`:");

    for line in io::BufReader::new(io::stdin()).lines() {
        let line = match line {
            Ok(x) => x,
            Err(_) => break,
        };
        let mut parts = line.split_whitespace();
        let parsed = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(value), None) => {
                value.parse::<i64>().ok().map(|value| (name, value))
            }
            _ => None,
        };
        match parsed {
            Some((name, value)) => {
                match carbon.add_value(format_args!("test.{}", name), value) {
                    Ok(()) => println!("Metric test.{} value {}", name, value),
                    Err(e) => println!("Invalid metric: {}", e),
                }
            }
            None => println!("Invalid format. Use `metric.name 1235`."),
        }
    }
    drop(carbon);
    io.join().expect("io thread");
}
