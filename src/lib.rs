pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::Settings;

pub use app::HttpServer;
pub use core::aggregate::AggregateConfig;
pub use core::bootstrap::{BootstrapReport, Bootstrapper};
pub use core::loader::{LoaderContext, LoaderOptions};
pub use utils::error::{BootstrapError, LoadFailure, Result};
