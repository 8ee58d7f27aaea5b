//! Causality chain data structures
//!
//! A chain is an arena of nodes addressed by index: `cause` is a parent
//! index and `effects` are child indexes, so the parent/child back-and-forth
//! never forms an ownership cycle. Nodes are stored in pre-order, root first.
//! Chains are ephemeral query results owned by the caller.

use serde::{Deserialize, Serialize};

use super::event::{CauseRelationship, Event};

/// Which side of the cause/effect graph to traverse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainDirection {
    /// Resolve the root ancestor only
    Causes,
    /// Expand effects downward from the focus event
    Effects,
    /// Resolve the root ancestor, then expand effects from it
    Both,
}

/// One event in a causality chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainNode {
    pub event: Event,

    /// 0 at the traversal root
    pub depth: usize,

    /// Arena index of the causing node; None at the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<usize>,

    /// Arena indexes of caused nodes, in sequence order
    pub effects: Vec<usize>,

    /// Link type to `cause`; None at the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<CauseRelationship>,
}

/// Counts per relationship kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByRelationship {
    pub triggered: usize,
    pub derived: usize,
    pub undone: usize,
    pub superseded: usize,
}

impl ByRelationship {
    pub fn increment(&mut self, relationship: CauseRelationship) {
        match relationship {
            CauseRelationship::Triggered => self.triggered += 1,
            CauseRelationship::Derived => self.derived += 1,
            CauseRelationship::Undone => self.undone += 1,
            CauseRelationship::Superseded => self.superseded += 1,
        }
    }

    pub fn count(&self, relationship: CauseRelationship) -> usize {
        match relationship {
            CauseRelationship::Triggered => self.triggered,
            CauseRelationship::Derived => self.derived,
            CauseRelationship::Undone => self.undone,
            CauseRelationship::Superseded => self.superseded,
        }
    }
}

/// Traversal statistics computed when a chain is built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    #[serde(rename = "totalEvents")]
    pub total_events: usize,

    #[serde(rename = "maxDepth")]
    pub max_depth: usize,

    /// Nodes with no cause
    #[serde(rename = "rootCount")]
    pub root_count: usize,

    /// Nodes with no effects
    #[serde(rename = "leafCount")]
    pub leaf_count: usize,

    #[serde(rename = "byRelationship")]
    pub by_relationship: ByRelationship,
}

/// Cause/effect tree for one focus event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalityChain {
    /// Pre-order arena; index 0 is the root
    pub nodes: Vec<ChainNode>,

    pub root: usize,

    pub stats: ChainStats,
}

impl CausalityChain {
    pub fn root_node(&self) -> &ChainNode {
        &self.nodes[self.root]
    }

    pub fn node(&self, index: usize) -> Option<&ChainNode> {
        self.nodes.get(index)
    }

    /// All nodes in pre-order.
    pub fn all_nodes(&self) -> &[ChainNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Arena index of the node holding the given event id.
    pub fn find(&self, event_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.event.id == event_id)
    }

    /// Membership test over the flattened node set.
    pub fn contains(&self, event_id: &str) -> bool {
        self.find(event_id).is_some()
    }

    /// Walk the `cause` chain upward: immediate cause first, root last.
    pub fn ancestors(&self, index: usize) -> Vec<&ChainNode> {
        let mut result = Vec::new();
        let mut current = self.nodes.get(index).and_then(|n| n.cause);
        while let Some(idx) = current {
            let node = &self.nodes[idx];
            result.push(node);
            current = node.cause;
        }
        result
    }

    /// All transitive effects below a node, pre-order, excluding the node.
    pub fn descendants(&self, index: usize) -> Vec<&ChainNode> {
        let mut result = Vec::new();
        let Some(start) = self.nodes.get(index) else {
            return result;
        };
        // Explicit stack; pathological chains must not exhaust call stack
        let mut stack: Vec<usize> = start.effects.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            result.push(node);
            stack.extend(node.effects.iter().rev().copied());
        }
        result
    }

    /// The cause's other effects, excluding this node. Empty at the root.
    pub fn siblings(&self, index: usize) -> Vec<&ChainNode> {
        let Some(cause_idx) = self.nodes.get(index).and_then(|n| n.cause) else {
            return Vec::new();
        };
        self.nodes[cause_idx]
            .effects
            .iter()
            .filter(|&&idx| idx != index)
            .map(|&idx| &self.nodes[idx])
            .collect()
    }

    pub fn filter_by_relationship(&self, relationship: CauseRelationship) -> Vec<&ChainNode> {
        self.nodes
            .iter()
            .filter(|n| n.relationship == Some(relationship))
            .collect()
    }

    pub fn nodes_at_depth(&self, depth: usize) -> Vec<&ChainNode> {
        self.nodes.iter().filter(|n| n.depth == depth).collect()
    }

    /// Path root -> ... -> node for the given event id, or None if absent.
    pub fn path_to_node(&self, event_id: &str) -> Option<Vec<&ChainNode>> {
        let index = self.find(event_id)?;
        let mut path: Vec<&ChainNode> = self.ancestors(index);
        path.reverse();
        path.push(&self.nodes[index]);
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventCategory;
    use serde_json::json;

    fn node(
        id: &str,
        sequence: u64,
        depth: usize,
        cause: Option<usize>,
        effects: Vec<usize>,
        relationship: Option<CauseRelationship>,
    ) -> ChainNode {
        ChainNode {
            event: Event::new(sequence, EventCategory::Game, "test", json!({})).with_id(id),
            depth,
            cause,
            effects,
            relationship,
        }
    }

    /// root -> child_a, root -> child_b -> grandchild
    fn sample_chain() -> CausalityChain {
        let nodes = vec![
            node("root", 1, 0, None, vec![1, 2], None),
            node("child_a", 2, 1, Some(0), vec![], Some(CauseRelationship::Triggered)),
            node("child_b", 3, 1, Some(0), vec![3], Some(CauseRelationship::Triggered)),
            node("grandchild", 4, 2, Some(2), vec![], Some(CauseRelationship::Derived)),
        ];
        let stats = ChainStats {
            total_events: 4,
            max_depth: 2,
            root_count: 1,
            leaf_count: 2,
            by_relationship: ByRelationship {
                triggered: 2,
                derived: 1,
                ..Default::default()
            },
        };
        CausalityChain {
            nodes,
            root: 0,
            stats,
        }
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let chain = sample_chain();
        let idx = chain.find("grandchild").unwrap();
        let ancestors = chain.ancestors(idx);
        assert_eq!(ancestors.len(), 2);
        assert_eq!(ancestors[0].event.id, "child_b");
        assert_eq!(ancestors[1].event.id, "root");
    }

    #[test]
    fn test_descendants_preorder() {
        let chain = sample_chain();
        let descendants = chain.descendants(0);
        let ids: Vec<&str> = descendants.iter().map(|n| n.event.id.as_str()).collect();
        assert_eq!(ids, vec!["child_a", "child_b", "grandchild"]);

        assert!(chain.descendants(1).is_empty());
    }

    #[test]
    fn test_siblings_exclude_self() {
        let chain = sample_chain();
        let idx = chain.find("child_a").unwrap();
        let siblings = chain.siblings(idx);
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].event.id, "child_b");

        // Root has no cause, so no siblings
        assert!(chain.siblings(0).is_empty());
    }

    #[test]
    fn test_path_to_node() {
        let chain = sample_chain();
        let path = chain.path_to_node("grandchild").unwrap();
        let ids: Vec<&str> = path.iter().map(|n| n.event.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "child_b", "grandchild"]);

        assert!(chain.path_to_node("missing").is_none());
    }

    #[test]
    fn test_filters_and_membership() {
        let chain = sample_chain();
        assert_eq!(
            chain.filter_by_relationship(CauseRelationship::Triggered).len(),
            2
        );
        assert_eq!(chain.nodes_at_depth(1).len(), 2);
        assert!(chain.contains("child_b"));
        assert!(!chain.contains("nope"));
    }

    #[test]
    fn test_by_relationship_counting() {
        let mut counts = ByRelationship::default();
        counts.increment(CauseRelationship::Triggered);
        counts.increment(CauseRelationship::Triggered);
        counts.increment(CauseRelationship::Superseded);
        assert_eq!(counts.count(CauseRelationship::Triggered), 2);
        assert_eq!(counts.count(CauseRelationship::Superseded), 1);
        assert_eq!(counts.count(CauseRelationship::Derived), 0);
    }
}
