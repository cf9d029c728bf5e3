pub mod commands;
pub mod completion;
pub mod config;
pub mod editor;
pub mod logging;
pub mod trigger;
