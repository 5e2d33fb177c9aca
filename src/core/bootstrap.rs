use crate::core::aggregate::{self, AggregateConfig};
use crate::core::discovery::{discover, DiscoveryResult};
use crate::core::loader::{load, LoaderContext, LoaderOptions, SkippedFile};
use crate::core::resolver::resolve;
use crate::utils::error::{BootstrapError, Result};

/// Outcome of one discovery run.
#[derive(Debug)]
pub struct BootstrapReport {
    pub config: AggregateConfig,
    pub loaded_files: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Drives path resolution, isolated loading, discovery and aggregation.
pub struct Bootstrapper {
    context: LoaderContext,
}

impl Bootstrapper {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            context: LoaderContext::new(options),
        }
    }

    pub fn context(&self) -> &LoaderContext {
        &self.context
    }

    /// Files are loaded one at a time in resolved order; a failing file is
    /// skipped and never affects the others.
    pub fn run<S: AsRef<str>>(
        &mut self,
        paths: &[S],
        explicit_name: Option<&str>,
    ) -> Result<BootstrapReport> {
        let files = resolve(paths)?;
        if files.is_empty() {
            return Err(BootstrapError::NoSourceFiles);
        }
        tracing::debug!("Resolved {} unit file(s)", files.len());

        let mut discovery = DiscoveryResult::default();
        let mut skipped = Vec::new();
        let mut loaded_files = 0;

        for file in &files {
            match load(file, &mut self.context) {
                Ok(unit) => {
                    loaded_files += 1;
                    discovery.extend(discover(&unit));
                }
                Err(skip) => skipped.push(skip),
            }
        }

        let config = aggregate::build(discovery.deduplicated(), paths, explicit_name)?;
        tracing::info!(
            "✅ Assembled '{}' from {} of {} file(s)",
            config.name,
            loaded_files,
            files.len()
        );

        Ok(BootstrapReport {
            config,
            loaded_files,
            skipped,
        })
    }
}

impl Default for Bootstrapper {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}
