//! Resource dependency graph.
//!
//! Builds a directed graph over one scan batch's [`ResourceRecord`]s and
//! answers the question the whole system hangs on: is it actually safe to
//! delete this resource?
//!
//! Edges point from dependent to dependency: `VM → Disk` means the VM
//! requires the disk. Deleting a resource is safe only when nothing else
//! in the batch depends on it, it is not part of a dependency cycle, and
//! it does not reference resources outside the batch (unless the provider
//! confirmed it orphaned).
//!
//! The graph is built once per scan, is read-only afterwards, and is
//! discarded when the policy phase completes.

use costguard_core::{ResourceId, ResourceRecord};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// A structural anomaly discovered while building the graph.
///
/// Cycles signal a data or modeling bug, not a deletion-safety fact; every
/// resource in a cycle is forced unsafe regardless of policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphAnomaly {
    #[error("dependency cycle among {} resource(s): {members:?}", members.len())]
    Cycle { members: Vec<ResourceId> },
}

/// Deletion-safety verdict for a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub safe: bool,
    /// Resources in the batch that depend on this one.
    pub dependents: Vec<ResourceId>,
    /// The resource is part of a detected dependency cycle.
    pub in_cycle: bool,
    /// `depends_on` targets that did not resolve inside the batch.
    pub external_dependencies: Vec<ResourceId>,
}

impl SafetyVerdict {
    /// Verdict for an id the graph has never seen. Nothing in the batch
    /// can depend on it.
    fn unknown() -> Self {
        Self {
            safe: true,
            dependents: Vec::new(),
            in_cycle: false,
            external_dependencies: Vec::new(),
        }
    }
}

/// Full impact of deleting one resource: everything that would lose a
/// dependency, directly or transitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionImpact {
    pub safe: bool,
    pub direct_dependents: Vec<ResourceId>,
    pub transitive_dependents: Vec<ResourceId>,
}

/// Directed dependency graph over one scan batch.
pub struct DependencyGraph {
    graph: DiGraph<ResourceId, ()>,
    indices: HashMap<ResourceId, NodeIndex>,
    /// Unresolved `depends_on` targets per node.
    external: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
    /// Members of any non-trivial strongly connected component.
    cyclic: BTreeSet<ResourceId>,
    /// Provider-confirmed orphans; exempt from the external-dependency rule.
    confirmed_orphans: BTreeSet<ResourceId>,
    anomalies: Vec<GraphAnomaly>,
    /// Non-cyclic node ids in dependency-respecting order, dependents
    /// before their dependencies.
    topo_order: Vec<ResourceId>,
}

impl DependencyGraph {
    /// Build the graph for a batch of normalized records.
    ///
    /// `depends_on` edges are restricted to ids present in the batch;
    /// unresolved targets are recorded as external dependencies, never
    /// dropped. Cycle detection runs once here (Tarjan, O(V+E)).
    pub fn build(records: &[ResourceRecord]) -> Self {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::with_capacity(records.len());

        for record in records {
            let idx = graph.add_node(record.id.clone());
            indices.insert(record.id.clone(), idx);
        }

        let mut external: BTreeMap<ResourceId, BTreeSet<ResourceId>> = BTreeMap::new();
        let mut confirmed_orphans = BTreeSet::new();

        for record in records {
            if record.is_confirmed_orphan() {
                confirmed_orphans.insert(record.id.clone());
            }
            let from = indices[&record.id];
            for dep in &record.depends_on {
                match indices.get(dep) {
                    Some(&to) => {
                        graph.add_edge(from, to, ());
                    }
                    None => {
                        tracing::debug!(
                            resource = %record.id,
                            dependency = %dep,
                            "Dependency target not in batch, recording as external"
                        );
                        external
                            .entry(record.id.clone())
                            .or_default()
                            .insert(dep.clone());
                    }
                }
            }
        }

        // Tarjan yields SCCs in reverse topological order of the
        // condensation; reversing gives dependents before dependencies.
        let sccs = petgraph::algo::tarjan_scc(&graph);
        let mut cyclic = BTreeSet::new();
        let mut anomalies = Vec::new();
        let mut topo_order = Vec::new();

        for scc in sccs.iter().rev() {
            let is_cycle = scc.len() > 1
                || (scc.len() == 1 && graph.contains_edge(scc[0], scc[0]));
            if is_cycle {
                let mut members: Vec<ResourceId> =
                    scc.iter().map(|&idx| graph[idx].clone()).collect();
                members.sort();
                tracing::warn!(
                    members = ?members,
                    "Dependency cycle detected, members forced unsafe"
                );
                cyclic.extend(members.iter().cloned());
                anomalies.push(GraphAnomaly::Cycle { members });
            } else {
                topo_order.push(graph[scc[0]].clone());
            }
        }

        Self {
            graph,
            indices,
            external,
            cyclic,
            confirmed_orphans,
            anomalies,
            topo_order,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Anomalies found at build time, in detection order.
    pub fn anomalies(&self) -> &[GraphAnomaly] {
        &self.anomalies
    }

    /// Whether the id belongs to a detected dependency cycle.
    pub fn in_cycle(&self, id: &ResourceId) -> bool {
        self.cyclic.contains(id)
    }

    /// Deletion-safety verdict for one resource.
    ///
    /// Ids the graph has never seen are safe: nothing in the batch can
    /// depend on them.
    pub fn safety(&self, id: &ResourceId) -> SafetyVerdict {
        let Some(&idx) = self.indices.get(id) else {
            return SafetyVerdict::unknown();
        };

        let mut dependents: Vec<ResourceId> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        dependents.sort();
        dependents.dedup();

        let in_cycle = self.cyclic.contains(id);
        let external_dependencies: Vec<ResourceId> = self
            .external
            .get(id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default();

        // External references mean the batch cannot prove the resource is
        // detached; only a provider-confirmed orphan overrides that.
        let externally_bound =
            !external_dependencies.is_empty() && !self.confirmed_orphans.contains(id);

        SafetyVerdict {
            safe: dependents.is_empty() && !in_cycle && !externally_bound,
            dependents,
            in_cycle,
            external_dependencies,
        }
    }

    pub fn is_safe_to_delete(&self, id: &ResourceId) -> bool {
        self.safety(id).safe
    }

    /// Resources that depend on `id` (direct only).
    pub fn dependents(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.safety(id).dependents
    }

    /// Resources `id` depends on (direct only, resolved within the batch).
    pub fn dependencies_of(&self, id: &ResourceId) -> Vec<ResourceId> {
        let Some(&idx) = self.indices.get(id) else {
            return Vec::new();
        };
        let mut deps: Vec<ResourceId> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Cascade analysis: every resource that transitively depends on `id`.
    pub fn deletion_impact(&self, id: &ResourceId) -> DeletionImpact {
        let direct = self.dependents(id);

        let mut transitive: BTreeSet<ResourceId> = BTreeSet::new();
        let mut queue: VecDeque<ResourceId> = direct.iter().cloned().collect();
        while let Some(current) = queue.pop_front() {
            if transitive.insert(current.clone()) {
                for parent in self.dependents(&current) {
                    queue.push_back(parent);
                }
            }
        }
        for d in &direct {
            transitive.remove(d);
        }

        DeletionImpact {
            safe: direct.is_empty(),
            direct_dependents: direct,
            transitive_dependents: transitive.into_iter().collect(),
        }
    }

    /// Dependency-respecting execution order over a set of deletion
    /// candidates: dependents come before the resources they depend on,
    /// so leaves of the dependency relation are deleted first. Cycle
    /// members are excluded — they are never execution-eligible.
    pub fn deletion_order(&self, candidates: &BTreeSet<ResourceId>) -> Vec<ResourceId> {
        self.topo_order
            .iter()
            .filter(|id| candidates.contains(id))
            .cloned()
            .collect()
    }
}
