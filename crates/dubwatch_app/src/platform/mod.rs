mod app;
mod cli;
mod config;
mod persistence;
mod ui;

pub use app::run_app;
