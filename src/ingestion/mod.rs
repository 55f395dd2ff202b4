pub mod market_client;
pub mod normalizer;
pub mod pipeline;
pub mod types;

pub use market_client::{MarketDataClient, MarketDataError};
pub use pipeline::{BatchOutcome, Pipeline};
