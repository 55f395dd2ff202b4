pub mod auth;
pub mod auto_trader;
pub mod exchange;
pub mod risk_manager;

pub use auth::ExchangeAuth;
pub use auto_trader::{AutoTrader, IterationReport, TraderStats};
pub use exchange::{Exchange, ExchangeError, PaperExchange, RestExchange};
pub use risk_manager::{RiskViolation, TraderCounters};
