pub mod aggregator;
pub mod battery;
pub mod sink;
