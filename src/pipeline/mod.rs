pub mod config;
pub mod core;

#[cfg(test)]
mod tests;

pub use self::config::*;
pub use self::core::*;
