use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

/// A currency amount in yuan, held as an exact decimal. Only display rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// An amount in fen.
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// Parses decimal text such as `"32.5"` or `"1e-3"` without going through binary floating point.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
            .map(Self)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn times(self, quantity: u32) -> Self {
        Self(
            self.0
                .checked_mul(Decimal::from(quantity))
                .unwrap_or(Decimal::MAX),
        )
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        write!(f, "{}¥{:.2}", sign, rounded.abs())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub price: Amount,
    pub quantity: u32,
}

impl LineItem {
    pub fn line_total(&self) -> Amount {
        self.price.times(self.quantity)
    }
}

/// A placed food order. The total is always derived from the line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    restaurant_name: String,
    items: Vec<LineItem>,
    delivery_address: String,
    total: Amount,
    eta: String,
}

impl Order {
    pub fn new(
        restaurant_name: String,
        items: Vec<LineItem>,
        delivery_address: String,
        eta: String,
    ) -> Self {
        let total = items.iter().map(LineItem::line_total).sum();
        Self {
            restaurant_name,
            items,
            delivery_address,
            total,
            eta,
        }
    }

    pub fn restaurant_name(&self) -> &str {
        &self.restaurant_name
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn delivery_address(&self) -> &str {
        &self.delivery_address
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn eta(&self) -> &str {
        &self.eta
    }
}
