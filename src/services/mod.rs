pub mod market_poller;

pub use market_poller::{poll_once, run_market_poller};
