use crate::domain::model::{Agent, InstanceId, Member, Step, Team, Workflow};
use async_trait::async_trait;

/// Common surface of every discoverable unit.
pub trait ServiceUnit: Send + Sync {
    fn instance(&self) -> InstanceId;
    fn unit_name(&self) -> Option<&str>;

    fn display_name(&self) -> &str {
        self.unit_name().unwrap_or("(unnamed)")
    }
}

/// An atomic, independently addressable unit.
pub trait LeafUnit: ServiceUnit {}

/// A unit coordinating an ordered collection of members.
pub trait GroupUnit: ServiceUnit {
    fn members(&self) -> &[Member];
}

/// A unit composed of ordered stages.
pub trait PipelineUnit: ServiceUnit {
    fn stages(&self) -> &[Step];
}

impl ServiceUnit for Agent {
    fn instance(&self) -> InstanceId {
        self.instance
    }

    fn unit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl LeafUnit for Agent {}

impl ServiceUnit for Team {
    fn instance(&self) -> InstanceId {
        self.instance
    }

    fn unit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl GroupUnit for Team {
    fn members(&self) -> &[Member] {
        &self.members
    }
}

impl ServiceUnit for Workflow {
    fn instance(&self) -> InstanceId {
        self.instance
    }

    fn unit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PipelineUnit for Workflow {
    fn stages(&self) -> &[Step] {
        &self.steps
    }
}

/// The serving collaborator: turns an aggregate into a running listener.
#[async_trait]
pub trait Serve: Send + Sync {
    async fn serve(&self, config: crate::core::aggregate::AggregateConfig) -> anyhow::Result<()>;
}
