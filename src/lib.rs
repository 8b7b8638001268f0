#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
