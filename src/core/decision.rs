// Price-to-action decision and trade de-duplication

use std::fmt;

use crate::core::grid::{nearest_level, GridLevels, GridSpec};
use crate::core::types::{TradeAction, TradeMemory};

/// Where the current price sits relative to the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridSignal {
    /// Under `price_low`: liquidate.
    BelowRange,
    /// Over `price_high`: hold.
    AboveRange,
    /// Under its nearest level.
    UnderLevel(f64),
    /// At or over its nearest level.
    OverLevel(f64),
}

impl GridSignal {
    pub fn intended_action(&self) -> Option<TradeAction> {
        match self {
            GridSignal::BelowRange | GridSignal::OverLevel(_) => Some(TradeAction::Sell),
            GridSignal::UnderLevel(_) => Some(TradeAction::Buy),
            GridSignal::AboveRange => None,
        }
    }

    pub fn nearest_level(&self) -> Option<f64> {
        match self {
            GridSignal::UnderLevel(level) | GridSignal::OverLevel(level) => Some(*level),
            _ => None,
        }
    }
}

impl fmt::Display for GridSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridSignal::BelowRange => write!(f, "below grid floor"),
            GridSignal::AboveRange => write!(f, "above grid ceiling"),
            GridSignal::UnderLevel(level) => write!(f, "under level ${:.4}", level),
            GridSignal::OverLevel(level) => write!(f, "at/over level ${:.4}", level),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    /// A sell must beat the last trade price strictly.
    SellNotAboveLastTrade { last_trade_price: f64 },
    /// The previous trade was already a buy.
    RepeatedBuy,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SellNotAboveLastTrade { last_trade_price } => {
                write!(f, "price not above last trade price ${:.4}", last_trade_price)
            }
            SkipReason::RepeatedBuy => write!(f, "last trade was already a buy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Hold,
    Skip { intended: TradeAction, reason: SkipReason },
    Trade(TradeAction),
}

impl Decision {
    pub fn action(&self) -> Option<TradeAction> {
        match self {
            Decision::Trade(action) => Some(*action),
            _ => None,
        }
    }
}

pub fn classify_price(price: f64, spec: &GridSpec, levels: &GridLevels) -> GridSignal {
    if price < spec.price_low {
        return GridSignal::BelowRange;
    }
    if price > spec.price_high {
        return GridSignal::AboveRange;
    }

    let closest = nearest_level(levels, price);
    if price < closest {
        GridSignal::UnderLevel(closest)
    } else {
        GridSignal::OverLevel(closest)
    }
}

/// Drop trades that would repeat a buy or sell without a strict profit.
pub fn filter_repeat(intended: TradeAction, price: f64, memory: &TradeMemory) -> Decision {
    match intended {
        TradeAction::Sell => match memory.last_trade_price() {
            Some(last_trade_price) if price <= last_trade_price => Decision::Skip {
                intended,
                reason: SkipReason::SellNotAboveLastTrade { last_trade_price },
            },
            _ => Decision::Trade(TradeAction::Sell),
        },
        TradeAction::Buy => {
            if memory.last_trade_action() == Some(TradeAction::Buy) {
                Decision::Skip { intended, reason: SkipReason::RepeatedBuy }
            } else {
                Decision::Trade(TradeAction::Buy)
            }
        }
    }
}

/// Full decision for one tick: grid signal, then the repeat filter.
pub fn decide(
    price: f64,
    spec: &GridSpec,
    levels: &GridLevels,
    memory: &TradeMemory,
) -> (GridSignal, Decision) {
    let signal = classify_price(price, spec, levels);
    let decision = match signal.intended_action() {
        Some(intended) => filter_repeat(intended, price, memory),
        None => Decision::Hold,
    };
    (signal, decision)
}
