//! In-memory forest of units with denormalized hierarchy closures.
//!
//! The [`Forest`] knows nothing about the filesystem. Units live in a flat
//! arena keyed by [`UnitId`]; the parent relation is held in a directed graph
//! (edges child→parent) which is the sole source of truth. Each node carries
//! two derived caches kept consistent with the graph on every mutation:
//!
//! - `ancestors`: the chain of higher headquarters, nearest-first,
//! - `descendants`: the set of all transitively subordinate units.
//!
//! Every mutation either fully applies (caches consistent, one logical clock
//! tick stamped on every touched unit) or returns an error leaving the forest
//! unchanged.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
};

use petgraph::{
    Direction,
    algo::{is_cyclic_directed, toposort},
    graphmap::DiGraphMap,
};
use thiserror::Error;
use tracing::instrument;

use crate::domain::{Echelon, Uic, Unit};

/// Index of a unit in the forest's arena.
///
/// Stable for the lifetime of the forest; units are archived in place, never
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(usize);

/// One arena slot: the unit plus its derived closure caches.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    unit: Unit,

    /// Chain of higher headquarters, nearest-first, up to the root.
    ancestors: Vec<UnitId>,

    /// All transitively subordinate units. Membership only; unordered.
    descendants: BTreeSet<UnitId>,
}

/// An in-memory forest of units with maintained hierarchy closures.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    /// Arena of units. Indices are [`UnitId`]s.
    nodes: Vec<Node>,

    /// Lookup from UIC to arena index. `BTreeMap` for ordered iteration.
    uic_to_id: BTreeMap<Uic, UnitId>,

    /// Parent relation. Edges point from child to parent; every node has at
    /// most one outgoing edge. This is the sole source of truth for the
    /// hierarchy.
    graph: DiGraphMap<UnitId, ()>,

    /// Logical clock. Each successful mutation ticks it once and stamps the
    /// new value on every touched unit.
    clock: u64,
}

/// Errors that can occur when inserting a unit.
#[derive(Debug, Error)]
pub enum InsertError {
    /// A unit with the same UIC already exists.
    #[error("unit {0} already exists")]
    Duplicate(Uic),
    /// The named parent unit could not be found.
    #[error("parent unit {0} not found")]
    ParentNotFound(Uic),
}

/// Errors that can occur when reparenting a unit.
#[derive(Debug, Error)]
pub enum ReparentError {
    /// The unit to move could not be found.
    #[error("unit {0} not found")]
    UnitNotFound(Uic),
    /// The new parent unit could not be found.
    #[error("parent unit {0} not found")]
    ParentNotFound(Uic),
    /// The move would make a unit subordinate to itself.
    #[error("moving {unit} under {parent} would create a cycle")]
    Cycle {
        /// UIC of the unit being moved.
        unit: Uic,
        /// UIC of the rejected new parent.
        parent: Uic,
    },
    /// The unit changed since the caller read it.
    #[error("unit {uic} was updated concurrently (expected as-of {expected}, found {actual})")]
    VersionConflict {
        /// UIC of the unit being moved.
        uic: Uic,
        /// Logical time the caller read.
        expected: u64,
        /// Logical time currently on the unit.
        actual: u64,
    },
}

/// Errors that can occur during a full-forest rebuild.
#[derive(Debug, Error)]
pub enum RebuildError {
    /// A unit names a parent that does not exist in the forest.
    #[error("unit {unit} names unknown parent {parent}")]
    UnknownParent {
        /// UIC of the unit with the dangling pointer.
        unit: Uic,
        /// The missing parent UIC.
        parent: Uic,
    },
    /// The parent pointers contain a cycle.
    #[error("parent pointers contain a cycle involving {0}")]
    Cycle(Uic),
}

/// Result of a successful insert.
#[derive(Debug)]
pub struct InsertOutcome {
    /// UIC of the new unit.
    pub uic: Uic,
    /// Every unit whose state changed: the new unit plus its ancestor chain.
    pub touched: Vec<Uic>,
    /// The logical time stamped on the touched units.
    pub as_of: u64,
}

/// Result of a successful reparent.
#[derive(Debug)]
pub struct ReparentOutcome {
    /// UIC of the moved unit.
    pub uic: Uic,
    /// The new parent, or `None` if the unit became a root.
    pub new_parent: Option<Uic>,
    /// Every unit whose state changed: the moved subtree plus the old and new
    /// ancestor chains. Empty for a no-op reparent.
    pub touched: Vec<Uic>,
    /// The logical time stamped on the touched units.
    pub as_of: u64,
}

impl ReparentOutcome {
    /// Whether the reparent was a no-op (parent unchanged).
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.touched.is_empty()
    }
}

/// Result of a successful full-forest rebuild.
#[derive(Debug)]
pub struct RebuildOutcome {
    /// Units whose closure caches were corrected by the rebuild. Empty when
    /// the incremental maintenance had kept everything consistent.
    pub changed: Vec<Uic>,
}

/// A discrepancy between a cached closure and the parent pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureIssue {
    /// A unit's parent chain loops back on itself.
    Cycle {
        /// UIC of a unit on the cycle.
        uic: Uic,
    },
    /// A unit's cached ancestor chain disagrees with its parent pointers.
    StaleAncestors {
        /// UIC of the affected unit.
        uic: Uic,
    },
    /// A unit's cached descendant set disagrees with the parent pointers.
    StaleDescendants {
        /// UIC of the affected unit.
        uic: Uic,
    },
}

impl fmt::Display for ClosureIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { uic } => write!(f, "{uic}: parent chain contains a cycle"),
            Self::StaleAncestors { uic } => write!(f, "{uic}: stale ancestor chain"),
            Self::StaleDescendants { uic } => write!(f, "{uic}: stale descendant set"),
        }
    }
}

/// A child unit whose echelon is not strictly below its parent's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchelonViolation {
    /// UIC of the child unit.
    pub child: Uic,
    /// Echelon of the child unit.
    pub child_echelon: Echelon,
    /// UIC of the parent unit.
    pub parent: Uic,
    /// Echelon of the parent unit.
    pub parent_echelon: Echelon,
}

impl fmt::Display for EchelonViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) sits under {} ({})",
            self.child, self.child_echelon, self.parent, self.parent_echelon
        )
    }
}

impl Forest {
    /// Creates a new forest with pre-allocated capacity for the given number
    /// of units.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            uic_to_id: BTreeMap::new(),
            graph: DiGraphMap::with_capacity(capacity, capacity),
            clock: 0,
        }
    }

    /// Number of units in the forest.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest contains no units.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The current logical time.
    #[must_use]
    pub const fn clock(&self) -> u64 {
        self.clock
    }

    /// Inserts a unit, wiring it under its named parent and updating the
    /// ancestor-side closures incrementally.
    ///
    /// # Errors
    ///
    /// Returns [`InsertError::Duplicate`] if the UIC is already present, or
    /// [`InsertError::ParentNotFound`] if the unit names a parent that does
    /// not exist.
    pub fn insert(&mut self, unit: Unit) -> Result<InsertOutcome, InsertError> {
        if self.uic_to_id.contains_key(&unit.uic) {
            return Err(InsertError::Duplicate(unit.uic.clone()));
        }
        let parent_id = unit
            .parent
            .as_ref()
            .map(|parent| {
                self.id_of(parent)
                    .ok_or_else(|| InsertError::ParentNotFound(parent.clone()))
            })
            .transpose()?;

        let uic = unit.uic.clone();
        let id = self.push_node(unit);

        let mut chain = Vec::new();
        if let Some(parent) = parent_id {
            self.graph.add_edge(id, parent, ());
            chain.push(parent);
            chain.extend_from_slice(&self.node(parent).ancestors);
        }
        for &ancestor in &chain {
            self.node_mut(ancestor).descendants.insert(id);
        }
        self.node_mut(id).ancestors.clone_from(&chain);

        self.clock += 1;
        let clock = self.clock;
        let mut touched = vec![id];
        touched.extend_from_slice(&chain);
        for &t in &touched {
            self.node_mut(t).unit.as_of = clock;
        }

        Ok(InsertOutcome {
            uic,
            touched: self.uics_of(&touched),
            as_of: clock,
        })
    }

    /// Inserts a unit without resolving its parent pointer or computing any
    /// closures.
    ///
    /// This is the bulk-load path: callers insert every unit first and then
    /// run [`Forest::resolve`], which resolves pointers in topological order.
    /// The unit's `as_of` stamp is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`InsertError::Duplicate`] if the UIC is already present.
    pub fn insert_detached(&mut self, unit: Unit) -> Result<UnitId, InsertError> {
        if self.uic_to_id.contains_key(&unit.uic) {
            return Err(InsertError::Duplicate(unit.uic.clone()));
        }
        Ok(self.push_node(unit))
    }

    /// Reassigns a unit's parent and restores closure consistency across the
    /// whole forest.
    ///
    /// The update is applied as one logical step:
    ///
    /// 1. short-circuit when the parent is unchanged (no cache churn),
    /// 2. reject moves that would create a cycle, before any mutation,
    /// 3. remove the moved subtree from the descendant sets of former
    ///    ancestors and add it to every new ancestor,
    /// 4. rewrite the ancestor chain of the moved unit and of every unit in
    ///    its subtree (the subtree's internal structure is unchanged; only
    ///    the prefix above the moved unit differs),
    /// 5. stamp every touched unit with one new logical clock tick.
    ///
    /// When `expected_as_of` is given, the move is rejected if the unit's
    /// `as_of` no longer matches. This is the optimistic-concurrency guard
    /// against lost updates from overlapping reorganizations.
    ///
    /// # Errors
    ///
    /// [`ReparentError::UnitNotFound`] / [`ReparentError::ParentNotFound`]
    /// when either UIC does not exist, [`ReparentError::Cycle`] when the new
    /// parent is the unit itself or one of its current subordinates, and
    /// [`ReparentError::VersionConflict`] when the optimistic-concurrency
    /// check fails. On error the forest is left untouched.
    #[instrument(skip(self), fields(unit = %uic))]
    pub fn reparent(
        &mut self,
        uic: &Uic,
        new_parent: Option<&Uic>,
        expected_as_of: Option<u64>,
    ) -> Result<ReparentOutcome, ReparentError> {
        let id = self
            .id_of(uic)
            .ok_or_else(|| ReparentError::UnitNotFound(uic.clone()))?;
        let new_parent_id = new_parent
            .map(|parent| {
                self.id_of(parent)
                    .ok_or_else(|| ReparentError::ParentNotFound(parent.clone()))
            })
            .transpose()?;

        if let Some(expected) = expected_as_of {
            let actual = self.node(id).unit.as_of;
            if actual != expected {
                return Err(ReparentError::VersionConflict {
                    uic: uic.clone(),
                    expected,
                    actual,
                });
            }
        }

        let old_parent_id = self.parent_id(id);
        if old_parent_id == new_parent_id {
            tracing::debug!("parent unchanged, skipping");
            return Ok(ReparentOutcome {
                uic: uic.clone(),
                new_parent: new_parent.cloned(),
                touched: Vec::new(),
                as_of: self.node(id).unit.as_of,
            });
        }

        if let Some(parent) = new_parent_id {
            if parent == id || self.node(id).descendants.contains(&parent) {
                return Err(ReparentError::Cycle {
                    unit: uic.clone(),
                    parent: self.uic_of(parent).clone(),
                });
            }
        }

        let new_chain = self.walk_new_chain(id, new_parent_id, uic)?;

        let old_chain = self.node(id).ancestors.clone();
        let mut moved = self.node(id).descendants.clone();
        moved.insert(id);

        self.transfer_descendants(&moved, &old_chain, &new_chain);

        // Rewire the relation itself.
        if let Some(old) = old_parent_id {
            self.graph.remove_edge(id, old);
        }
        if let Some(new) = new_parent_id {
            self.graph.add_edge(id, new, ());
        }
        let parent_uic = new_parent_id.map(|p| self.uic_of(p).clone());
        self.node_mut(id).ancestors.clone_from(&new_chain);
        self.node_mut(id).unit.parent = parent_uic.clone();

        // Propagate the new prefix through the moved subtree.
        self.rewrite_subtree_chains(id);

        // One clock tick stamps everything the operation touched.
        self.clock += 1;
        let clock = self.clock;
        let mut touched = moved;
        touched.extend(old_chain.iter().copied());
        touched.extend(new_chain.iter().copied());
        for &t in &touched {
            self.node_mut(t).unit.as_of = clock;
        }

        let touched: Vec<UnitId> = touched.into_iter().collect();
        tracing::debug!(touched = touched.len(), "reparented");

        Ok(ReparentOutcome {
            uic: uic.clone(),
            new_parent: parent_uic,
            touched: self.uics_of(&touched),
            as_of: clock,
        })
    }

    /// Ancestor-side bookkeeping for a move: former ancestors not shared
    /// with the new chain lose the moved subtree, every new ancestor gains
    /// it.
    fn transfer_descendants(
        &mut self,
        moved: &BTreeSet<UnitId>,
        old_chain: &[UnitId],
        new_chain: &[UnitId],
    ) {
        let new_chain_set: BTreeSet<UnitId> = new_chain.iter().copied().collect();
        for &ancestor in old_chain.iter().filter(|a| !new_chain_set.contains(a)) {
            let descendants = &mut self.node_mut(ancestor).descendants;
            for member in moved {
                descendants.remove(member);
            }
        }
        for &ancestor in new_chain {
            self.node_mut(ancestor)
                .descendants
                .extend(moved.iter().copied());
        }
    }

    /// Walks the prospective ancestor chain through live parent pointers.
    ///
    /// The visited guard doubles as a safety net should the descendant cache
    /// ever disagree with the graph.
    fn walk_new_chain(
        &self,
        moving: UnitId,
        new_parent: Option<UnitId>,
        uic: &Uic,
    ) -> Result<Vec<UnitId>, ReparentError> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::from([moving]);
        let mut current = new_parent;
        while let Some(node) = current {
            if !seen.insert(node) {
                return Err(ReparentError::Cycle {
                    unit: uic.clone(),
                    parent: self.uic_of(node).clone(),
                });
            }
            chain.push(node);
            current = self.parent_id(node);
        }
        Ok(chain)
    }

    /// Rewrites the ancestor chain of every unit below `root`, parents
    /// first, from the already-updated chain of each unit's parent. The
    /// subtree's internal structure is unchanged; only the prefix above
    /// `root` differs.
    fn rewrite_subtree_chains(&mut self, root: UnitId) {
        let mut queue: VecDeque<UnitId> = self.children_ids(root).into();
        while let Some(child) = queue.pop_front() {
            let mut chain = Vec::new();
            if let Some(parent) = self.parent_id(child) {
                chain.push(parent);
                chain.extend_from_slice(&self.node(parent).ancestors);
            }
            self.node_mut(child).ancestors = chain;
            queue.extend(self.children_ids(child));
        }
    }

    /// Recomputes every closure cache from the parent pointers, returning
    /// the ids whose caches were corrected.
    ///
    /// Units are processed in topological order (parents first) to derive
    /// ancestor chains, then a single pass inverts the ancestor relation to
    /// produce the descendant sets. The logical clock is advanced past the
    /// highest `as_of` found; stamping is left to the caller.
    fn recompute(&mut self) -> Result<Vec<UnitId>, RebuildError> {
        // Re-derive the relation graph from the serialized pointers.
        let mut graph = DiGraphMap::with_capacity(self.nodes.len(), self.nodes.len());
        for id in 0..self.nodes.len() {
            graph.add_node(UnitId(id));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(parent_uic) = &node.unit.parent {
                let parent =
                    self.uic_to_id
                        .get(parent_uic)
                        .ok_or_else(|| RebuildError::UnknownParent {
                            unit: node.unit.uic.clone(),
                            parent: parent_uic.clone(),
                        })?;
                graph.add_edge(UnitId(idx), *parent, ());
            }
        }

        // Edges point child→parent, so the topological order lists children
        // before parents; reversed, every parent precedes its children.
        let order = toposort(&graph, None)
            .map_err(|cycle| RebuildError::Cycle(self.uic_of(cycle.node_id()).clone()))?;
        self.graph = graph;

        let before: Vec<(Vec<UnitId>, BTreeSet<UnitId>)> = self
            .nodes
            .iter()
            .map(|node| (node.ancestors.clone(), node.descendants.clone()))
            .collect();

        for &id in order.iter().rev() {
            let chain = self.parent_id(id).map_or_else(Vec::new, |parent| {
                let mut chain = vec![parent];
                chain.extend_from_slice(&self.node(parent).ancestors);
                chain
            });
            self.node_mut(id).ancestors = chain;
        }

        for node in &mut self.nodes {
            node.descendants.clear();
        }
        for idx in 0..self.nodes.len() {
            let id = UnitId(idx);
            let ancestors = self.node(id).ancestors.clone();
            for ancestor in ancestors {
                self.node_mut(ancestor).descendants.insert(id);
            }
        }

        let max_as_of = self
            .nodes
            .iter()
            .map(|node| node.unit.as_of)
            .max()
            .unwrap_or(0);
        self.clock = self.clock.max(max_as_of);

        let changed: Vec<UnitId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(idx, node)| {
                before[*idx].0 != node.ancestors || before[*idx].1 != node.descendants
            })
            .map(|(idx, _)| UnitId(idx))
            .collect();

        Ok(changed)
    }

    /// Resolves parent pointers and populates the closure caches after a
    /// bulk load of detached units.
    ///
    /// Unlike [`Forest::rebuild`], populating the caches does not advance
    /// any `as_of` stamp: a freshly loaded forest matches its source data
    /// exactly.
    ///
    /// # Errors
    ///
    /// [`RebuildError::UnknownParent`] if any unit names a parent that is not
    /// in the forest, or [`RebuildError::Cycle`] if the pointers loop. On
    /// error the forest is left unchanged.
    #[instrument(skip(self), fields(units = self.len()))]
    pub fn resolve(&mut self) -> Result<(), RebuildError> {
        self.recompute()?;
        Ok(())
    }

    /// Recomputes every closure from the serialized parent pointers,
    /// stamping each corrected unit with one fresh clock tick.
    ///
    /// This is the repair path for caches that have drifted from the parent
    /// pointers. An empty [`RebuildOutcome::changed`] means the incremental
    /// maintenance had kept everything consistent.
    ///
    /// # Errors
    ///
    /// [`RebuildError::UnknownParent`] if any unit names a parent that is not
    /// in the forest, or [`RebuildError::Cycle`] if the pointers loop. On
    /// error the forest is left unchanged.
    #[instrument(skip(self), fields(units = self.len()))]
    pub fn rebuild(&mut self) -> Result<RebuildOutcome, RebuildError> {
        let changed = self.recompute()?;

        if !changed.is_empty() {
            self.clock += 1;
            let clock = self.clock;
            for &id in &changed {
                self.node_mut(id).unit.as_of = clock;
            }
        }

        Ok(RebuildOutcome {
            changed: self.uics_of(&changed),
        })
    }

    /// Finds a unit by its UIC.
    #[must_use]
    pub fn find(&self, uic: &Uic) -> Option<&Unit> {
        self.id_of(uic).map(|id| &self.node(id).unit)
    }

    /// Returns an iterator over all units, ordered by UIC.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.uic_to_id.values().map(|&id| &self.node(id).unit)
    }

    /// Returns the UICs of all root units (no parent), ordered.
    pub fn roots(&self) -> impl Iterator<Item = &Uic> + '_ {
        self.iter()
            .filter(|unit| unit.parent.is_none())
            .map(Unit::uic)
    }

    /// The chain of higher headquarters of a unit, nearest-first.
    ///
    /// A direct cache read; never triggers recomputation.
    #[must_use]
    pub fn ancestors_of(&self, uic: &Uic) -> Option<Vec<Uic>> {
        let id = self.id_of(uic)?;
        Some(self.uics_of(&self.node(id).ancestors))
    }

    /// All units transitively subordinate to a unit, optionally including the
    /// unit itself.
    ///
    /// A direct cache read; never triggers recomputation.
    #[must_use]
    pub fn descendants_of(&self, uic: &Uic, include_self: bool) -> Option<BTreeSet<Uic>> {
        let id = self.id_of(uic)?;
        let mut result: BTreeSet<Uic> = self
            .node(id)
            .descendants
            .iter()
            .map(|&d| self.uic_of(d).clone())
            .collect();
        if include_self {
            result.insert(uic.clone());
        }
        Some(result)
    }

    /// The immediate children of a unit: one level down, not the full
    /// subtree.
    #[must_use]
    pub fn children_of(&self, uic: &Uic) -> Option<BTreeSet<Uic>> {
        let id = self.id_of(uic)?;
        Some(
            self.children_ids(id)
                .into_iter()
                .map(|c| self.uic_of(c).clone())
                .collect(),
        )
    }

    /// The subordinate hierarchy of a unit, optionally limited to units
    /// within `max_depth` parent-hops.
    ///
    /// With `max_depth = Some(1)` this is the immediate children; with `None`
    /// it is the full descendant set.
    #[must_use]
    pub fn subordinate_hierarchy(
        &self,
        uic: &Uic,
        include_self: bool,
        max_depth: Option<usize>,
    ) -> Option<BTreeSet<Uic>> {
        let id = self.id_of(uic)?;
        let base = self.node(id).ancestors.len();
        let mut result: BTreeSet<Uic> = self
            .node(id)
            .descendants
            .iter()
            .filter(|&&d| {
                max_depth.is_none_or(|depth| self.node(d).ancestors.len() <= base + depth)
            })
            .map(|&d| self.uic_of(d).clone())
            .collect();
        if include_self {
            result.insert(uic.clone());
        }
        Some(result)
    }

    /// A unit's depth in the hierarchy (0 for roots).
    #[must_use]
    pub fn level_of(&self, uic: &Uic) -> Option<usize> {
        let id = self.id_of(uic)?;
        Some(self.node(id).ancestors.len())
    }

    /// Whether the parent relation is acyclic.
    ///
    /// Always `true` after a successful load; mutations reject moves that
    /// would break it.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// Recomputes every closure from the relation graph and reports each
    /// discrepancy against the caches.
    ///
    /// Read-only; consumed by repair and validation tooling. An empty result
    /// means the caches are exactly the closure of the parent relation.
    #[must_use]
    pub fn verify_closure(&self) -> Vec<ClosureIssue> {
        let mut issues = Vec::new();

        // Recompute each ancestor chain by walking parent pointers.
        let mut expected_chains: Vec<Option<Vec<UnitId>>> = Vec::with_capacity(self.nodes.len());
        for idx in 0..self.nodes.len() {
            let id = UnitId(idx);
            let mut chain = Vec::new();
            let mut seen = BTreeSet::from([id]);
            let mut current = self.parent_id(id);
            let mut cyclic = false;
            while let Some(node) = current {
                if !seen.insert(node) {
                    cyclic = true;
                    break;
                }
                chain.push(node);
                current = self.parent_id(node);
            }
            if cyclic {
                issues.push(ClosureIssue::Cycle {
                    uic: self.uic_of(id).clone(),
                });
                expected_chains.push(None);
            } else {
                expected_chains.push(Some(chain));
            }
        }

        // Invert the recomputed chains into expected descendant sets.
        let mut expected_descendants: Vec<BTreeSet<UnitId>> =
            vec![BTreeSet::new(); self.nodes.len()];
        for (idx, chain) in expected_chains.iter().enumerate() {
            if let Some(chain) = chain {
                for ancestor in chain {
                    expected_descendants[ancestor.0].insert(UnitId(idx));
                }
            }
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(chain) = &expected_chains[idx] {
                if node.ancestors != *chain {
                    issues.push(ClosureIssue::StaleAncestors {
                        uic: node.unit.uic.clone(),
                    });
                }
            }
            if node.descendants != expected_descendants[idx] {
                issues.push(ClosureIssue::StaleDescendants {
                    uic: node.unit.uic.clone(),
                });
            }
        }

        issues
    }

    /// Lists every child unit whose ranked echelon is not strictly below its
    /// parent's ranked echelon.
    ///
    /// Advisory only: real-world data contains exceptions, so the ordering is
    /// surfaced by validation rather than enforced here.
    #[must_use]
    pub fn echelon_violations(&self) -> Vec<EchelonViolation> {
        let mut violations = Vec::new();
        for &id in self.uic_to_id.values() {
            let Some(parent) = self.parent_id(id) else {
                continue;
            };
            let child_echelon = self.node(id).unit.echelon;
            let parent_echelon = self.node(parent).unit.echelon;
            if !child_echelon.may_subordinate_to(parent_echelon) {
                violations.push(EchelonViolation {
                    child: self.node(id).unit.uic.clone(),
                    child_echelon,
                    parent: self.node(parent).unit.uic.clone(),
                    parent_echelon,
                });
            }
        }
        violations
    }

    fn push_node(&mut self, unit: Unit) -> UnitId {
        let id = UnitId(self.nodes.len());
        self.uic_to_id.insert(unit.uic.clone(), id);
        self.graph.add_node(id);
        self.nodes.push(Node {
            unit,
            ancestors: Vec::new(),
            descendants: BTreeSet::new(),
        });
        id
    }

    fn id_of(&self, uic: &Uic) -> Option<UnitId> {
        self.uic_to_id.get(uic).copied()
    }

    fn uic_of(&self, id: UnitId) -> &Uic {
        &self.node(id).unit.uic
    }

    fn uics_of(&self, ids: &[UnitId]) -> Vec<Uic> {
        ids.iter().map(|&id| self.uic_of(id).clone()).collect()
    }

    fn node(&self, id: UnitId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: UnitId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn parent_id(&self, id: UnitId) -> Option<UnitId> {
        self.graph
            .neighbors_directed(id, Direction::Outgoing)
            .next()
    }

    fn children_ids(&self, id: UnitId) -> Vec<UnitId> {
        self.graph
            .neighbors_directed(id, Direction::Incoming)
            .collect()
    }
}
