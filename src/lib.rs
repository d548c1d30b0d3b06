//! Live GPU telemetry page for Jetson-style boards: per-device history
//! charts, status fields, frequency gauges and a process table, drawn into a
//! ratatui buffer.

pub mod app;
pub mod collector;
pub mod config;
pub mod format;
pub mod layout;
pub mod logging;
pub mod page;
pub mod parser;
pub mod processes;
pub mod surface;
pub mod telemetry;
pub mod ui;
pub mod widgets;
