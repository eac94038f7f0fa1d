use std::sync::Arc;
use std::time::Duration;

use crate::Config;


impl Config {
    /// Create the config builder with all defaults
    pub fn new() -> Config {
        Config {
            reconnect_delay: Duration::new(1, 0),
            max_metrics_buffered: 10000,
            output_watermark: 60_000,
        }
    }

    /// Set the reconnect delay
    ///
    /// Note: the first reconnect after the connection was established is
    /// immediate. I.e. if connection is broken after a minute of normal
    /// work it will reconnect immediately, and wait for this delay only if
    /// that attempt fails too.
    pub fn reconnect_delay(&mut self, delay: Duration) -> &mut Self {
        self.reconnect_delay = delay;
        self
    }

    /// Maximum metrics buffered in a channel
    ///
    /// Metrics are dropped when the channel is full. Metrics pulled from
    /// the channel while there is no connection are dropped too, so this
    /// only smooths out short bursts and a slow network.
    pub fn max_metrics_buffered(&mut self, metrics: usize) -> &mut Self {
        self.max_metrics_buffered = metrics;
        self
    }

    /// Output buffer size at which we stop pulling metrics from the channel
    ///
    /// # Panics
    ///
    /// Panics if watermark is zero.
    pub fn output_watermark(&mut self, bytes: usize) -> &mut Self {
        assert!(bytes > 0);
        self.output_watermark = bytes;
        self
    }

    /// Create a Arc'd config clone to pass to the constructor
    ///
    /// This is just a convenience method.
    pub fn done(&mut self) -> Arc<Config> {
        Arc::new(self.clone())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::Config;

    #[test]
    fn defaults() {
        let cfg = Config::new().done();
        assert_eq!(cfg.reconnect_delay, Duration::new(1, 0));
        assert_eq!(cfg.max_metrics_buffered, 10000);
        assert_eq!(cfg.output_watermark, 60_000);
    }

    #[test]
    fn builder() {
        let cfg = Config::new()
            .reconnect_delay(Duration::from_millis(100))
            .max_metrics_buffered(5)
            .output_watermark(10)
            .done();
        assert_eq!(cfg.reconnect_delay, Duration::from_millis(100));
        assert_eq!(cfg.max_metrics_buffered, 5);
        assert_eq!(cfg.output_watermark, 10);
    }

    #[test]
    #[should_panic]
    fn zero_watermark() {
        Config::new().output_watermark(0);
    }
}
