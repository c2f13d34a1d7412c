pub mod transcript;
pub mod types;

pub use transcript::{Entry, PendingReply, Transcript};
pub use types::{Message, MessageId, Sender, TYPING_ID};
