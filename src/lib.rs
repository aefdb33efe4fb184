pub mod config;
pub mod error;
pub mod incident;
pub mod ipv6;
pub mod launcher;
pub mod prompt;
pub mod resolver;
pub mod rewriter;
pub mod script;
pub mod utils;
pub mod workflow;
