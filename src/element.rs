/// A formatted metric line including the trailing newline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric(pub Vec<u8>);
