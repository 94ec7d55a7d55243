pub mod commands;
pub mod handler;
pub mod poller;

pub use commands::{parse_command, Command, CommandError};
pub use handler::BotHandler;
pub use poller::UpdatePoller;
