pub mod completion;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod store;
