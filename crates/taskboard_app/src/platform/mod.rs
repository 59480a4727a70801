//! Terminal front end: argument/config handling, the message loop, and rendering.
mod app;
mod cli;
mod config;
mod effects;
mod render;

pub use app::run_app;
