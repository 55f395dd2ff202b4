pub mod detector;
pub mod scorer;
pub mod signal_factory;
pub mod validator;

pub use detector::{detect_whales, whale_confidence, PriceTracker};
pub use scorer::score_signal;
pub use signal_factory::signal_from_whale;
pub use validator::{advance_signal, validate_pending, Advance};
