// Plain-text rendering of the transcript for the terminal.

use std::fmt::Write;

use crate::conversation::{Message, Role};
use crate::order::Order;

pub const LOADING_INDICATOR: &str = "Nova ···";

pub fn render_message(message: &Message) -> String {
    let sender = match message.role {
        Role::User => "你",
        Role::Assistant => "Nova",
    };
    let mut out = format!("{} {}: {}", message.timestamp, sender, message.text);
    if let Some(order) = message.order() {
        out.push('\n');
        out.push_str(&render_order_card(order));
    }
    out
}

pub fn render_order_card(order: &Order) -> String {
    let mut card = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(card, "┌ 餐饮确认");
    let _ = writeln!(card, "│ {}", order.restaurant_name());
    for item in order.items() {
        let _ = writeln!(card, "│   {}x {}  {}", item.quantity, item.name, item.line_total());
    }
    let _ = writeln!(card, "│ 配送至：{}", order.delivery_address());
    let _ = writeln!(card, "│ 预计时间 {}", order.eta());
    let _ = writeln!(card, "│ 总计金额 {}", order.total());
    let _ = write!(card, "└ [确认订单]");
    card
}
