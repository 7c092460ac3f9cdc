pub mod chat;
pub mod constants;
pub mod conversation;
pub mod dictation;
pub mod gateway;
pub mod interpreter;
pub mod location;
pub mod order;
pub mod render;
pub mod turn;

pub use conversation::{ConversationStore, Message, MessageBody, Role};
pub use gateway::{AssistantGateway, FailureKind, GatewayConfig, GatewayError, GeminiGateway, Invocation, RemoteError, Reply};
pub use interpreter::{interpret, parse_order, InterpretationError};
pub use location::Location;
pub use order::{Amount, LineItem, Order};
pub use turn::{IgnoreReason, TurnController, TurnOutcome};
