pub mod command;
pub mod handler;
pub mod responder;

pub use handler::Bot;
