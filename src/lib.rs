// Library surface for the binary, headless tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod assistant;
pub mod config;
pub mod content;
pub mod history;
pub mod progress;
pub mod quiz;
pub mod rules;
pub mod runtime;
pub mod scoring;
pub mod shield;
pub mod store;
pub mod trainer;
pub mod ui;
pub mod util;
