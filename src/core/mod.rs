pub mod aggregate;
pub mod bootstrap;
pub mod dedup;
pub mod discovery;
pub mod hint;
pub mod loader;
pub mod module;
pub mod resolver;

pub use crate::domain::model::{Agent, Member, Step, Team, Workflow};
pub use crate::domain::ports::{GroupUnit, LeafUnit, PipelineUnit, Serve, ServiceUnit};
pub use crate::utils::error::Result;
