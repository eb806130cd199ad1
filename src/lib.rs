pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod poll;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod stats;
