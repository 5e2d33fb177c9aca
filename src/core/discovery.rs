use crate::core::dedup::dedupe;
use crate::core::module::LoadedUnit;
use crate::domain::model::{Agent, Team, Workflow};
use std::sync::Arc;

/// Units found at module level, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub agents: Vec<Arc<Agent>>,
    pub teams: Vec<Arc<Team>>,
    pub workflows: Vec<Arc<Workflow>>,
}

impl DiscoveryResult {
    pub fn total(&self) -> usize {
        self.agents.len() + self.teams.len() + self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Appends another file's discoveries after this one's.
    pub fn extend(&mut self, other: DiscoveryResult) {
        self.agents.extend(other.agents);
        self.teams.extend(other.teams);
        self.workflows.extend(other.workflows);
    }

    /// Drops agents that are already direct members of a discovered team.
    pub fn deduplicated(self) -> Self {
        let agents = dedupe(self.agents, &self.teams);
        Self { agents, ..self }
    }
}

pub fn is_private(name: &str) -> bool {
    name.starts_with('_')
}

/// Classifies the public top-level values of `unit`.
///
/// Checks run most-specific first (workflow, then team, then agent), so a
/// value lands in at most one list. Anything else is ignored.
pub fn discover(unit: &LoadedUnit) -> DiscoveryResult {
    let mut result = DiscoveryResult::default();

    for (name, value) in unit.values() {
        if is_private(name) {
            continue;
        }
        if let Some(workflow) = value.as_pipeline() {
            result.workflows.push(Arc::clone(workflow));
        } else if let Some(team) = value.as_group() {
            result.teams.push(Arc::clone(team));
        } else if let Some(agent) = value.as_leaf() {
            result.agents.push(Arc::clone(agent));
        }
    }

    tracing::debug!(
        "Discovered {} agent(s), {} team(s), {} workflow(s) in {}",
        result.agents.len(),
        result.teams.len(),
        result.workflows.len(),
        unit.path().display()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::LoaderContext;
    use crate::core::module::execute;
    use crate::domain::ports::ServiceUnit;
    use std::path::Path;

    fn discover_source(source: &str) -> DiscoveryResult {
        let mut ctx = LoaderContext::default();
        let unit = execute(source, Path::new("units.toml"), "_test_units", &mut ctx).unwrap();
        discover(&unit)
    }

    fn names<T: ServiceUnit>(units: &[Arc<T>]) -> Vec<&str> {
        units.iter().map(|u| u.display_name()).collect()
    }

    #[test]
    fn test_classifies_each_kind_once() {
        let result = discover_source(
            r#"
model = "openai:gpt-4o"

[writer]
kind = "agent"
name = "Writer"

[editor]
kind = "agent"

[team]
kind = "team"
name = "Desk"
members = ["writer"]

[flow]
kind = "workflow"
name = "Publish"
steps = [{ unit = "team" }]

[settings]
retries = 3
"#,
        );

        assert_eq!(names(&result.agents), vec!["(unnamed)", "Writer"]);
        assert_eq!(names(&result.teams), vec!["Desk"]);
        assert_eq!(names(&result.workflows), vec!["Publish"]);
        assert_eq!(result.total(), 4);
    }

    #[test]
    fn test_private_names_are_skipped() {
        let result = discover_source(
            r#"
[_draft]
kind = "agent"
name = "Draft"

[team]
kind = "team"
members = ["_draft"]
"#,
        );

        assert!(result.agents.is_empty());
        assert_eq!(result.teams.len(), 1);
        assert_eq!(result.teams[0].members.len(), 1);
    }

    #[test]
    fn test_inline_members_are_not_top_level() {
        let result = discover_source(
            r#"
[team]
kind = "team"
members = [{ kind = "agent", name = "Inline" }]
"#,
        );
        assert!(result.agents.is_empty());
        assert_eq!(result.teams.len(), 1);
    }

    #[test]
    fn test_extend_preserves_file_order() {
        let mut all = discover_source("[b]\nkind = \"agent\"\nname = \"B\"\n");
        all.extend(discover_source("[a]\nkind = \"agent\"\nname = \"A\"\n"));
        assert_eq!(names(&all.agents), vec!["B", "A"]);
    }

    #[test]
    fn test_empty_module_discovers_nothing() {
        assert!(discover_source("title = \"nothing here\"\n").is_empty());
    }
}
