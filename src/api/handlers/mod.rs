pub mod auto_trade;
pub mod config;
pub mod events;
pub mod market;
pub mod signals;
pub mod system;
pub mod trades;
