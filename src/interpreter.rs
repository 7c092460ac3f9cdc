//! Turns a raw model reply into a transcript message.
//!
//! Invocation arguments come from an untrusted remote source, so they are parsed
//! field by field into a typed [`Order`]. Anything that cannot form an order
//! degrades to a plain-text message instead of failing the turn.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants;
use crate::conversation::Message;
use crate::gateway::Reply;
use crate::order::{Amount, LineItem, Order};

#[derive(Debug, Error, PartialEq)]
pub enum InterpretationError {
    #[error("invocation arguments are not an object")]
    NotAnObject,
    #[error("argument `{0}` is missing or not a string")]
    MissingField(&'static str),
}

pub fn interpret(reply: Reply) -> Message {
    let text = if reply.text.is_empty() {
        constants::EMPTY_REPLY_FALLBACK.to_string()
    } else {
        reply.text
    };

    match reply.invocation {
        Some(invocation) if invocation.name == constants::PLACE_FOOD_ORDER => {
            match parse_order(&invocation.arguments) {
                Ok(order) => {
                    debug!(restaurant = order.restaurant_name(), total = %order.total(), "Interpreted food order");
                    Message::assistant_order(text, order)
                }
                Err(e) => {
                    warn!(error = %e, arguments = %invocation.arguments, "Discarding malformed order invocation");
                    Message::assistant(text)
                }
            }
        }
        Some(invocation) => {
            warn!(name = %invocation.name, "Ignoring unknown invocation");
            Message::assistant(text)
        }
        None => Message::assistant(text),
    }
}

pub fn parse_order(arguments: &Value) -> Result<Order, InterpretationError> {
    let args = arguments.as_object().ok_or(InterpretationError::NotAnObject)?;

    let restaurant_name = required_string(args, "restaurantName")?;
    let delivery_address = required_string(args, "deliveryAddress")?;
    let items = match args.get("items") {
        Some(Value::Array(raw)) => raw.iter().filter_map(parse_line_item).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(items = %other, "`items` is not an array, treating as empty");
            Vec::new()
        }
    };

    Ok(Order::new(
        restaurant_name,
        items,
        delivery_address,
        constants::ORDER_ETA.to_string(),
    ))
}

fn required_string(args: &Map<String, Value>, field: &'static str) -> Result<String, InterpretationError> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(InterpretationError::MissingField(field))
}

/// Lines without a name or with a quantity below one are dropped; bad prices count as zero.
fn parse_line_item(raw: &Value) -> Option<LineItem> {
    let name = raw.get("name")?.as_str()?.to_string();

    let price = raw
        .get("price")
        .and_then(amount)
        .filter(|p| *p >= Amount::ZERO)
        .unwrap_or(Amount::ZERO);

    let quantity = raw.get("quantity").and_then(number).unwrap_or(0.0).trunc();
    if quantity.is_nan() || quantity < 1.0 {
        debug!(%name, "Dropping line item with non-positive quantity");
        return None;
    }
    let quantity = if quantity > f64::from(u32::MAX) {
        u32::MAX
    } else {
        quantity as u32
    };

    Some(LineItem { name, price, quantity })
}

/// Prices are read from the number's decimal text so that sums stay exact.
fn amount(value: &Value) -> Option<Amount> {
    match value {
        Value::Number(n) => Amount::parse(&n.to_string()),
        Value::String(s) => Amount::parse(s),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
