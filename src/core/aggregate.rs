use crate::core::discovery::DiscoveryResult;
use crate::domain::model::{Agent, Team, Workflow};
use crate::domain::ports::{GroupUnit, ServiceUnit};
use crate::utils::error::{BootstrapError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub const NAME_PREFIX: &str = "AgentOS: ";

/// Everything the serving collaborator needs.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateConfig {
    pub name: String,
    pub agents: Vec<Arc<Agent>>,
    pub teams: Vec<Arc<Team>>,
    pub workflows: Vec<Arc<Workflow>>,
    pub assembled_at: DateTime<Utc>,
}

impl AggregateConfig {
    pub fn total(&self) -> usize {
        self.agents.len() + self.teams.len() + self.workflows.len()
    }

    pub fn summary(&self, loaded_files: usize) -> DiscoverySummary<'_> {
        DiscoverySummary {
            config: self,
            loaded_files,
        }
    }
}

/// Bundles deduplicated discoveries under one name.
///
/// Fails when nothing was discovered at all.
pub fn build<S: AsRef<str>>(
    discovery: DiscoveryResult,
    requested_paths: &[S],
    explicit_name: Option<&str>,
) -> Result<AggregateConfig> {
    if discovery.is_empty() {
        return Err(BootstrapError::NoUnitsDiscovered);
    }

    let name = match explicit_name {
        Some(name) => name.to_string(),
        None => synthesize_name(requested_paths),
    };

    Ok(AggregateConfig {
        name,
        agents: discovery.agents,
        teams: discovery.teams,
        workflows: discovery.workflows,
        assembled_at: Utc::now(),
    })
}

/// `AgentOS: ` followed by one label per requested path: the directory's
/// own name, or the file name without its extension.
pub fn synthesize_name<S: AsRef<str>>(requested_paths: &[S]) -> String {
    let labels: Vec<String> = requested_paths
        .iter()
        .map(|raw| {
            let path = Path::new(raw.as_ref());
            let label = if path.is_dir() {
                path.file_name()
            } else {
                path.file_stem()
            };
            label
                .map(|l| l.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.as_ref().to_string())
        })
        .collect();
    format!("{}{}", NAME_PREFIX, labels.join(", "))
}

/// Human-readable discovery report written before serving.
pub struct DiscoverySummary<'a> {
    config: &'a AggregateConfig,
    loaded_files: usize,
}

impl fmt::Display for DiscoverySummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config;
        writeln!(
            f,
            "Loaded {} file(s), discovered {} object(s):",
            self.loaded_files,
            config.total()
        )?;
        writeln!(f)?;
        for agent in &config.agents {
            writeln!(f, "  Agent:    {}", agent.display_name())?;
        }
        for team in &config.teams {
            writeln!(f, "  Team:     {}", team.display_name())?;
            for member in team.members() {
                writeln!(f, "            - {}", member.name().unwrap_or("(unnamed)"))?;
            }
        }
        for workflow in &config.workflows {
            writeln!(f, "  Workflow: {}", workflow.display_name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{InstanceId, Member};
    use tempfile::TempDir;

    fn agent(name: Option<&str>) -> Arc<Agent> {
        Arc::new(Agent {
            instance: InstanceId::next(),
            id: None,
            name: name.map(str::to_string),
            description: None,
            model: "openai:gpt-4o".to_string(),
            instructions: None,
            tools: Vec::new(),
        })
    }

    #[test]
    fn test_empty_discovery_fails() {
        let err = build(DiscoveryResult::default(), &["agents/"], None).unwrap_err();
        assert!(matches!(err, BootstrapError::NoUnitsDiscovered));
    }

    #[test]
    fn test_explicit_name_is_used_verbatim() {
        let discovery = DiscoveryResult {
            agents: vec![agent(Some("Foo"))],
            ..Default::default()
        };
        let config = build(discovery, &["whatever.toml"], Some("My AgentOS")).unwrap();
        assert_eq!(config.name, "My AgentOS");
        assert_eq!(config.total(), 1);
    }

    #[test]
    fn test_synthesized_name_uses_requested_paths() {
        let temp_dir = TempDir::new().unwrap();
        let teams_dir = temp_dir.path().join("teams");
        std::fs::create_dir(&teams_dir).unwrap();
        let file = temp_dir.path().join("basic_agent.toml");

        let name = synthesize_name(&[
            teams_dir.to_str().unwrap(),
            file.to_str().unwrap(),
        ]);
        assert_eq!(name, "AgentOS: teams, basic_agent");
    }

    #[test]
    fn test_summary_lists_team_members() {
        let writer = agent(Some("Writer"));
        let team = Arc::new(Team {
            instance: InstanceId::next(),
            id: None,
            name: Some("Desk".to_string()),
            description: None,
            mode: None,
            model: "openai:gpt-4o".to_string(),
            members: vec![Member::Agent(writer), Member::Agent(agent(None))],
        });
        let discovery = DiscoveryResult {
            agents: vec![agent(Some("Solo"))],
            teams: vec![team],
            workflows: Vec::new(),
        };
        let config = build(discovery, &["desk.toml"], None).unwrap();

        let summary = config.summary(1).to_string();
        assert!(summary.starts_with("Loaded 1 file(s), discovered 2 object(s):"));
        assert!(summary.contains("  Agent:    Solo\n"));
        assert!(summary.contains("  Team:     Desk\n            - Writer\n            - (unnamed)\n"));
    }
}
