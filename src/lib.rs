//! Client for the graphite (carbon) plaintext protocol
//!
//! There are two levels of API:
//!
//! * [`Connection`] is a single outbound connection with its own
//!   reconnect schedule. It is driven by an [`Engine`], either the
//!   bundled [`TokioEngine`] or your own event loop.
//! * [`Carbon`] is a cloneable handle that formats values and hands them
//!   to a background future created by [`Init::connect_to`].
//!
//! The [`parse`] function validates and splits raw `metric value timestamp`
//! lines and can be used on its own, for example in a line relay.
#![warn(missing_docs)]

extern crate bytes;
extern crate futures;
extern crate num_traits;
extern crate thiserror;
extern crate tokio;

#[macro_use] extern crate log;

use std::time::Duration;

mod channel;
mod config;
mod connection;
mod element;
mod engine;
mod error;
mod parse;
mod public;
mod tokio_engine;

pub use connection::{Callbacks, Connection, Handler, State};
pub use engine::{Engine, Event};
pub use error::{Field, NotConnected, ParseError};
pub use parse::{parse, validate_key, Line};
pub use public::{Carbon, Init};
pub use tokio_engine::TokioEngine;

/// Default port of the carbon plaintext listener
pub const DEFAULT_PORT: u16 = 2003;

/// Configuration of the `Carbon` front-end
///
/// Create with `Config::new()`, tune with the builder methods and
/// finish with `done()`.
#[derive(Debug, Clone)]
pub struct Config {
    reconnect_delay: Duration,
    max_metrics_buffered: usize,
    output_watermark: usize,
}
