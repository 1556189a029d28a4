pub mod agent;
pub mod audit;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod progress;
pub mod project_config;
pub mod prompts;
pub mod qa;
pub mod session;
pub mod spec;
pub mod steering;
pub mod stream;
pub mod tracker;
pub mod ui;
