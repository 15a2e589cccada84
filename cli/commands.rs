pub mod completion;
pub mod config;
pub mod generate;
pub mod prompts;
pub mod scan;
