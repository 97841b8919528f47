//! Chat engine: rooms, sessions, messages, and the hub that ties them together.

pub mod hub;
pub mod message;
pub mod room;
pub mod session;

pub use hub::{Hub, HubStats};
pub use message::{ChatRequest, Message, MessageKind};
pub use room::Room;
pub use session::{ClientSession, DeliveryResult, OUTBOUND_QUEUE_CAPACITY};
