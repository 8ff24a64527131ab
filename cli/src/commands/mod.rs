//! Command implementations

pub mod console;
pub mod down;
pub mod follow_logs;
pub mod restart_app;
pub mod shell;
pub mod up;
