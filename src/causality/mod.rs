//! Causality chain builder
//!
//! Reconstructs cause/effect trees from `causedBy` back-references. The
//! ancestor walk and the downward expansion are both visited-set guarded, so
//! traversal terminates on malformed cyclic data and the node count is
//! bounded by the event population. Chains are ephemeral query results;
//! indexes are rebuilt per call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::store::EventStore;
use crate::types::{
    CausalityChain, CauseRelationship, ChainDirection, ChainNode, ChainStats, Event,
};

/// Builds causality chains over a store's full event population.
pub struct CausalityChainBuilder {
    store: Arc<EventStore>,
}

struct Pending<'a> {
    event: &'a Event,
    parent: Option<usize>,
    depth: usize,
    relationship: Option<CauseRelationship>,
}

impl CausalityChainBuilder {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    /// Build the chain around a focus event.
    ///
    /// For `Causes`/`Both` the `causedBy` pointers are walked upward to the
    /// root first; a cycle stops the walk and the current event stands as
    /// root. For `Effects`/`Both` the tree is then expanded downward while
    /// node depth stays below `max_depth`. `Causes` alone returns just the
    /// resolved root, unexpanded.
    pub fn compute_chain(
        &self,
        event_id: &str,
        direction: ChainDirection,
        max_depth: usize,
    ) -> Result<CausalityChain> {
        let events = self.store.all_events();

        let mut by_id: HashMap<&str, &Event> = HashMap::with_capacity(events.len());
        // Events caused by each event, already in sequence order
        let mut children: HashMap<&str, Vec<&Event>> = HashMap::new();
        for event in &events {
            by_id.entry(event.id.as_str()).or_insert(event);
            if let Some(caused_by) = &event.caused_by {
                children
                    .entry(caused_by.event_id.as_str())
                    .or_default()
                    .push(event);
            }
        }

        let focus = *by_id
            .get(event_id)
            .ok_or_else(|| LedgerError::not_found("event", event_id))?;

        let root = match direction {
            ChainDirection::Causes | ChainDirection::Both => resolve_root(focus, &by_id),
            ChainDirection::Effects => focus,
        };

        let expand_effects = matches!(direction, ChainDirection::Effects | ChainDirection::Both);
        let mut nodes: Vec<ChainNode> = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut work = vec![Pending {
            event: root,
            parent: None,
            depth: 0,
            relationship: None,
        }];

        // Iterative pre-order: arena insertion order is traversal order
        while let Some(pending) = work.pop() {
            if !visited.insert(pending.event.id.as_str()) {
                continue;
            }

            let index = nodes.len();
            nodes.push(ChainNode {
                event: pending.event.clone(),
                depth: pending.depth,
                cause: pending.parent,
                effects: Vec::new(),
                relationship: pending.relationship,
            });
            if let Some(parent) = pending.parent {
                nodes[parent].effects.push(index);
            }

            if expand_effects && pending.depth < max_depth {
                if let Some(caused) = children.get(pending.event.id.as_str()) {
                    // Reversed push so siblings pop in sequence order
                    for child in caused.iter().rev() {
                        let relationship = child.caused_by.as_ref().map(|c| c.relationship);
                        work.push(Pending {
                            event: child,
                            parent: Some(index),
                            depth: pending.depth + 1,
                            relationship,
                        });
                    }
                }
            }
        }

        let stats = compute_stats(&nodes);
        debug!(
            focus = event_id,
            direction = ?direction,
            nodes = nodes.len(),
            "causality chain built"
        );

        Ok(CausalityChain {
            nodes,
            root: 0,
            stats,
        })
    }
}

/// Walk `causedBy` upward until an event with no cause, an unknown
/// reference, or a cycle. The visited set makes the walk terminate on any
/// input.
fn resolve_root<'a>(focus: &'a Event, by_id: &HashMap<&str, &'a Event>) -> &'a Event {
    let mut current = focus;
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(current.id.as_str());

    while let Some(caused_by) = &current.caused_by {
        match by_id.get(caused_by.event_id.as_str()) {
            Some(&parent) if !visited.contains(parent.id.as_str()) => {
                visited.insert(parent.id.as_str());
                current = parent;
            }
            // Dangling reference or cycle: current stands as root
            _ => break,
        }
    }
    current
}

fn compute_stats(nodes: &[ChainNode]) -> ChainStats {
    let mut stats = ChainStats {
        total_events: nodes.len(),
        ..Default::default()
    };
    for node in nodes {
        stats.max_depth = stats.max_depth.max(node.depth);
        if node.cause.is_none() {
            stats.root_count += 1;
        }
        if node.effects.is_empty() {
            stats.leaf_count += 1;
        }
        if let Some(relationship) = node.relationship {
            stats.by_relationship.increment(relationship);
        }
    }
    stats
}
