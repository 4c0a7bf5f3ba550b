//! Utility modules
//!
//! Filesystem layout and logger bootstrap

pub mod config_paths;
pub mod logger;

pub use config_paths::GrapplerPaths;
pub use logger::init_logger;
