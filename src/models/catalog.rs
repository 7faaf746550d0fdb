//! Input items and their price history.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A raw material that recipes and bills of materials consume.
///
/// `current_price` is the live catalog price and the fallback when no
/// history entry is in force for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    /// Unique identifier for the input.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit of measure the price is expressed in (e.g. "kg").
    #[serde(default)]
    pub unit: Option<String>,
    /// The live price per unit.
    pub current_price: Decimal,
}

/// One dated price change of an input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// The input this price applies to.
    pub input_id: String,
    /// Price per unit from `effective_from` onward.
    pub price: Decimal,
    /// The instant the price took effect.
    pub effective_from: NaiveDateTime,
}
