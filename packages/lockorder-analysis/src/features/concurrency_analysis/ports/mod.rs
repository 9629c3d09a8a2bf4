/// Lock-Order Analysis Ports
pub mod reachability_oracle_port;

pub use reachability_oracle_port::*;
