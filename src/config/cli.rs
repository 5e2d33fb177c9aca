use crate::config::settings::Settings;
use crate::utils::error::{BootstrapError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "agentos-serve")]
#[command(about = "Serve agents, teams and workflows discovered in unit files")]
#[command(version)]
pub struct CliConfig {
    /// Unit files or directories to scan (directories are not searched recursively)
    #[arg(required = true, num_args = 1..)]
    pub paths: Vec<String>,

    /// Port to serve on [default: 7777]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind [default: localhost]
    #[arg(long)]
    pub host: Option<String>,

    /// Name of the assembled service
    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl CliConfig {
    /// 命令列參數優先於設定檔與環境變數
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(BootstrapError::InvalidConfigValueError {
                field: "paths".to_string(),
                value: String::new(),
                reason: "At least one path is required".to_string(),
            });
        }
        for path in &self.paths {
            validate_non_empty_string("paths", path)?;
        }
        if let Some(name) = &self.name {
            validate_non_empty_string("name", name)?;
        }
        if let Some(host) = &self.host {
            validate_non_empty_string("host", host)?;
        }
        Ok(())
    }
}
