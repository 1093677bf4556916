// Grid construction and nearest-level lookup

use serde::{Deserialize, Serialize};

use crate::error::{TradingError, TradingResult};

/// Price band and step count the grid is built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub price_low: f64,
    pub price_high: f64,
    pub level_count: usize,
}

impl GridSpec {
    pub fn new(price_low: f64, price_high: f64, level_count: usize) -> Self {
        Self { price_low, price_high, level_count }
    }

    /// Distance between two neighbouring levels
    pub fn step(&self) -> f64 {
        (self.price_high - self.price_low) / self.level_count as f64
    }

    pub fn check(&self) -> Result<(), String> {
        if !self.price_low.is_finite() || !self.price_high.is_finite() {
            return Err(format!(
                "grid bounds must be finite (price_low={}, price_high={})",
                self.price_low, self.price_high
            ));
        }
        if self.price_high <= self.price_low {
            return Err(format!(
                "price_high ({}) must be greater than price_low ({})",
                self.price_high, self.price_low
            ));
        }
        if self.level_count < 1 {
            return Err("level_count must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.price_low && price <= self.price_high
    }
}

/// Ascending grid prices, `level_count + 1` of them
#[derive(Debug, Clone, PartialEq)]
pub struct GridLevels {
    levels: Vec<f64>,
}

impl GridLevels {
    pub fn as_slice(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn lowest(&self) -> f64 {
        self.levels[0]
    }

    pub fn highest(&self) -> f64 {
        self.levels[self.levels.len() - 1]
    }

    pub fn nearest(&self, price: f64) -> f64 {
        nearest_level(self, price)
    }
}

/// Build evenly spaced levels from `price_low` to `price_high` inclusive.
pub fn build_levels(spec: &GridSpec) -> TradingResult<GridLevels> {
    spec.check().map_err(TradingError::InvalidGridSpec)?;

    let step = spec.step();
    let mut levels: Vec<f64> = (0..=spec.level_count)
        .map(|i| spec.price_low + i as f64 * step)
        .collect();

    // Pin the end points so accumulated rounding never moves the band edges.
    levels[0] = spec.price_low;
    levels[spec.level_count] = spec.price_high;

    Ok(GridLevels { levels })
}

/// Level closest to `price`. On a tie the lower level wins.
pub fn nearest_level(levels: &GridLevels, price: f64) -> f64 {
    let mut closest = levels.levels[0];
    let mut best_distance = (closest - price).abs();

    for &level in &levels.levels[1..] {
        let distance = (level - price).abs();
        if distance < best_distance {
            closest = level;
            best_distance = distance;
        }
    }

    closest
}
