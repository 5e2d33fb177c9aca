use crate::domain::ports::{GroupUnit, LeafUnit, ServiceUnit};
use std::collections::HashSet;
use std::sync::Arc;

/// Removes leaves that are direct members of any of `groups`.
///
/// Membership is by instance identity, never by content. Only direct
/// members count: an agent reachable only through a nested team or a
/// workflow step is kept.
pub fn dedupe<L: LeafUnit, G: GroupUnit>(leaves: Vec<Arc<L>>, groups: &[Arc<G>]) -> Vec<Arc<L>> {
    let member_ids: HashSet<_> = groups
        .iter()
        .flat_map(|group| group.members())
        .filter_map(|member| member.as_agent())
        .map(|agent| agent.instance())
        .collect();

    leaves
        .into_iter()
        .filter(|leaf| !member_ids.contains(&leaf.instance()))
        .collect()
}
