pub mod config;
pub mod tracked;
