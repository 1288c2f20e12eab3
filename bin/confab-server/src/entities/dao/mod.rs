pub mod agent;
pub mod chat;
pub mod session;

pub use agent::{Agent, AgentDocument};
pub use chat::{ChatMessage, FileAttachment, MessageRole};
pub use session::ChatSession;
