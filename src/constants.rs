// Defaults, overridable from the environment or the command line.

use std::env;

lazy_static::lazy_static! {
    pub static ref GEMINI_BASE_URL: String = env::var("NOVA_BASE_URL").unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
    pub static ref NOVA_MODEL: String = env::var("NOVA_MODEL").unwrap_or_else(|_| "gemini-3-flash-preview".to_string());
}

/// Environment variable holding the Gemini API key. Read on every call, never cached.
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";

/// Name of the single function declared to the model.
pub const PLACE_FOOD_ORDER: &str = "placeFoodOrder";

pub const ORDER_ETA: &str = "预计 35 分钟后送达";

/// Shown when the model answers with neither text nor a usable order.
pub const EMPTY_REPLY_FALLBACK: &str = "已收到指令。";

pub const CONFIGURATION_ERROR_TEXT: &str = "未检测到 API_KEY，请在环境变量中配置后重试。";
pub const REMOTE_ERROR_TEXT: &str = "连接超时，请确保环境变量中的 API_KEY 已正确配置。";

pub const GREETING: &str = "你好，我是 Nova。你可以说『帮我点份麦当劳』或者『寻找附近的意料餐厅』。";

pub const DEMO_UTTERANCE: &str = "帮我点一份附近评价最好的黄焖鸡米饭";
pub const DICTATION_TICK_MS: u64 = 60;
pub const DICTATION_SETTLE_MS: u64 = 800;
