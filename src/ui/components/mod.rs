//! UI building blocks

mod header;
mod input_bar;
mod message_list;

pub use header::Header;
pub use input_bar::InputBar;
pub use message_list::MessageList;
