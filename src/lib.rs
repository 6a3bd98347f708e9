pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod paging;
pub mod scanner;
pub mod session;
#[cfg(feature = "telegram")]
pub mod telegram;

#[cfg(test)]
mod testing;
