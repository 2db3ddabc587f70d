pub mod config;
pub mod data;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod phase;
pub mod settings;
pub mod stage;
pub mod stages;
pub mod ui;
