pub mod config;
pub mod inputs;
pub mod once;
pub mod prompt;
pub mod run;
