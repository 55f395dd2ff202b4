use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stored text value that doesn't map to any variant of the target enum.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Text mapping for enums persisted as TEXT columns.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod event;
pub mod signal;
pub mod snapshot;
pub mod stats;
pub mod trade;

pub use event::{PumpDumpEvent, WhaleEvent};
pub use signal::{Signal, StageCheck, STAGE_COUNT};
pub use snapshot::{MarketSnapshot, MarketSource};
pub use stats::{SignalStats, TradeStats, WhaleFlow};
pub use trade::{Trade, TradeClose};

// ---------------------------------------------------------------------------
// Direction: the hypothesis a signal (and the trade opened from it) carries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

text_enum!(Direction { Long => "LONG", Short => "SHORT" });

impl Direction {
    /// +1 for LONG, -1 for SHORT. Multiplies a raw price move into a PnL sign.
    pub fn sign(&self) -> rust_decimal::Decimal {
        match self {
            Direction::Long => rust_decimal::Decimal::ONE,
            Direction::Short => rust_decimal::Decimal::NEGATIVE_ONE,
        }
    }
}

// ---------------------------------------------------------------------------
// Event tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhaleSide {
    Buy,
    Sell,
}

text_enum!(WhaleSide { Buy => "buy", Sell => "sell" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpDumpKind {
    Pump,
    Dump,
}

text_enum!(PumpDumpKind { Pump => "pump", Dump => "dump" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

text_enum!(Trend { Bullish => "bullish", Bearish => "bearish", Neutral => "neutral" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhaleFlowTag {
    Inflow,
    Outflow,
    Neutral,
}

text_enum!(WhaleFlowTag { Inflow => "inflow", Outflow => "outflow", Neutral => "neutral" });

// ---------------------------------------------------------------------------
// Lifecycle states
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Pending,
    Valid,
    Invalid,
}

text_enum!(SignalStatus { Pending => "pending", Valid => "valid", Invalid => "invalid" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

text_enum!(TradeStatus { Open => "open", Closed => "closed" });

/// Exchange-side state of the order behind a persisted trade.
///
/// A trade is written as `open` before the exchange is contacted; this field
/// records whether the exchange actually accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Submitted,
    Simulated,
    Failed,
}

text_enum!(OrderStatus {
    Pending => "pending",
    Submitted => "submitted",
    Simulated => "simulated",
    Failed => "failed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
}

text_enum!(CloseReason { StopLoss => "stop_loss", TakeProfit => "take_profit" });
