//! Node ordering and contraction.
//!
//! Nodes are removed from a mutable overlay graph one at a time. Before a
//! node `v` is removed, every path `u -> v -> x` that no witness search can
//! match is replaced by a shortcut `u -> x`. The contraction order is picked
//! greedily from a lazily updated priority queue: a popped node's priority
//! is recomputed and the node is pushed back if it is no longer minimal.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chprep_core::config::ContractionConfig;
use chprep_core::{BuilderError, HierarchyBuilder};
use fixedbitset::FixedBitSet;
use tracing::{debug, info, instrument};

use crate::hierarchy::{ContractionHierarchy, NO_MIDDLE, UpwardGraph};
use crate::witness::WitnessSearch;

/// One arc of the overlay. In an incoming list `to` is the arc's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) to: u32,
    pub(crate) weight: u32,
    pub(crate) middle: u32,
}

/// A shortcut `from -> to` that replaces a path through the node being
/// contracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shortcut {
    from: u32,
    to: u32,
    weight: u32,
}

/// The remaining graph during contraction.
///
/// `out` and `inc` only ever reference uncontracted nodes; a node's lists
/// are emptied when it is contracted.
struct Overlay {
    out: Vec<Vec<Edge>>,
    inc: Vec<Vec<Edge>>,
    contracted: FixedBitSet,
    contracted_neighbors: Vec<u32>,
}

impl Overlay {
    /// Self loops are dropped; parallel arcs keep the minimum weight.
    fn new(node_count: usize, arc_sources: &[u32], head: &[u32], weight: &[u32]) -> Self {
        let mut overlay = Self {
            out: vec![Vec::new(); node_count],
            inc: vec![Vec::new(); node_count],
            contracted: FixedBitSet::with_capacity(node_count),
            contracted_neighbors: vec![0; node_count],
        };
        for ((&u, &x), &w) in arc_sources.iter().zip(head).zip(weight) {
            if u != x {
                overlay.add_arc(u, x, w, NO_MIDDLE);
            }
        }
        overlay
    }

    fn add_arc(&mut self, from: u32, to: u32, weight: u32, middle: u32) {
        upsert(&mut self.out[from as usize], to, weight, middle);
        upsert(&mut self.inc[to as usize], from, weight, middle);
    }

    /// Shortcuts needed if `v` were contracted now.
    fn shortcuts(
        &self,
        v: u32,
        search: &mut WitnessSearch,
    ) -> Result<Vec<Shortcut>, BuilderError> {
        let outgoing = &self.out[v as usize];
        let mut shortcuts = Vec::new();

        for incoming in &self.inc[v as usize] {
            let u = incoming.to;
            let w_in = u64::from(incoming.weight);
            let Some(max_out) = outgoing
                .iter()
                .filter(|e| e.to != u)
                .map(|e| u64::from(e.weight))
                .max()
            else {
                continue;
            };

            search.run(&self.out, u, v, w_in + max_out);

            for edge in outgoing.iter().filter(|e| e.to != u) {
                let via = w_in + u64::from(edge.weight);
                if search.distance(edge.to) > via {
                    let weight = u32::try_from(via).map_err(|_| {
                        BuilderError::InconsistentInput(format!(
                            "shortcut {u} -> {} through node {v} has weight {via}, which overflows 32 bits",
                            edge.to
                        ))
                    })?;
                    shortcuts.push(Shortcut {
                        from: u,
                        to: edge.to,
                        weight,
                    });
                }
            }
        }
        Ok(shortcuts)
    }

    /// Edge difference plus the number of already contracted neighbours.
    #[allow(clippy::cast_possible_wrap)]
    fn priority(&self, v: u32, shortcut_count: usize) -> i64 {
        let degree = self.out[v as usize].len() + self.inc[v as usize].len();
        shortcut_count as i64 - degree as i64 + i64::from(self.contracted_neighbors[v as usize])
    }

    /// Remove `v`, returning its remaining outgoing and incoming arcs.
    fn contract(&mut self, v: u32, shortcuts: &[Shortcut]) -> (Vec<Edge>, Vec<Edge>) {
        let out = std::mem::take(&mut self.out[v as usize]);
        let inc = std::mem::take(&mut self.inc[v as usize]);
        self.contracted.insert(v as usize);

        let mut neighbors: Vec<u32> = out.iter().chain(&inc).map(|e| e.to).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        for &n in &neighbors {
            self.out[n as usize].retain(|e| e.to != v);
            self.inc[n as usize].retain(|e| e.to != v);
            self.contracted_neighbors[n as usize] += 1;
        }

        for s in shortcuts {
            self.add_arc(s.from, s.to, s.weight, v);
        }
        (out, inc)
    }
}

/// Insert an arc to `to`, or lower the weight of an existing one.
fn upsert(list: &mut Vec<Edge>, to: u32, weight: u32, middle: u32) {
    match list.iter_mut().find(|e| e.to == to) {
        Some(existing) if weight < existing.weight => {
            existing.weight = weight;
            existing.middle = middle;
        }
        Some(_) => {}
        None => list.push(Edge { to, weight, middle }),
    }
}

/// Builds a [`ContractionHierarchy`].
#[derive(Debug, Clone, Default)]
pub struct ContractionBuilder {
    config: ContractionConfig,
}

impl ContractionBuilder {
    #[must_use]
    pub const fn new(config: ContractionConfig) -> Self {
        Self { config }
    }

    /// Contracted-node count between intermediate progress lines, or
    /// `None` when they are disabled.
    fn progress_step(&self, node_count: usize) -> Option<usize> {
        let percent = usize::from(self.config.progress_percent.min(100));
        (percent > 0).then(|| (node_count * percent / 100).max(1))
    }
}

fn check_input(
    node_count: usize,
    arc_sources: &[u32],
    head: &[u32],
    weight: &[u32],
) -> Result<(), BuilderError> {
    if u32::try_from(node_count).is_err() {
        return Err(BuilderError::InconsistentInput(format!(
            "{node_count} nodes do not fit 32-bit ids"
        )));
    }
    if arc_sources.len() != head.len() || head.len() != weight.len() {
        return Err(BuilderError::InconsistentInput(format!(
            "arc arrays differ in length: {} sources, {} heads, {} weights",
            arc_sources.len(),
            head.len(),
            weight.len()
        )));
    }
    if let Some((arc, (&u, &x))) = arc_sources
        .iter()
        .zip(head)
        .enumerate()
        .find(|&(_, (&u, &x))| u as usize >= node_count || x as usize >= node_count)
    {
        return Err(BuilderError::InconsistentInput(format!(
            "arc {arc} ({u} -> {x}) references a node outside 0..{node_count}"
        )));
    }
    Ok(())
}

impl HierarchyBuilder for ContractionBuilder {
    type Output = ContractionHierarchy;

    #[instrument(skip_all, fields(nodes = node_count, arcs = head.len()))]
    fn build(
        &self,
        node_count: usize,
        arc_sources: &[u32],
        head: &[u32],
        weight: &[u32],
        progress: &mut dyn FnMut(&str),
    ) -> Result<ContractionHierarchy, BuilderError> {
        check_input(node_count, arc_sources, head, weight)?;

        progress(&format!(
            "contracting {node_count} nodes with {} arcs",
            head.len()
        ));

        let mut overlay = Overlay::new(node_count, arc_sources, head, weight);
        let mut search = WitnessSearch::new(node_count, self.config.witness_settle_limit);

        let mut queue = BinaryHeap::with_capacity(node_count);
        for v in 0..node_count as u32 {
            let shortcuts = overlay.shortcuts(v, &mut search)?;
            queue.push(Reverse((overlay.priority(v, shortcuts.len()), v)));
        }
        debug!(queued = queue.len(), "initial priorities computed");

        let step = self.progress_step(node_count);
        let mut rank = vec![0_u32; node_count];
        let mut order = Vec::with_capacity(node_count);
        let mut forward = Vec::new();
        let mut backward = Vec::new();
        let mut shortcut_total = 0_usize;

        while let Some(Reverse((_, v))) = queue.pop() {
            if overlay.contracted.contains(v as usize) {
                continue;
            }

            let shortcuts = overlay.shortcuts(v, &mut search)?;
            let current = overlay.priority(v, shortcuts.len());
            if queue
                .peek()
                .is_some_and(|&Reverse((next, _))| current > next)
            {
                queue.push(Reverse((current, v)));
                continue;
            }

            rank[v as usize] = order.len() as u32;
            order.push(v);
            shortcut_total += shortcuts.len();

            let (out, inc) = overlay.contract(v, &shortcuts);
            forward.extend(out.iter().map(|e| (v, e.to, e.weight, e.middle)));
            backward.extend(inc.iter().map(|e| (v, e.to, e.weight, e.middle)));

            let done = order.len();
            if step.is_some_and(|s| done % s == 0) && done < node_count {
                progress(&format!(
                    "contracted {done}/{node_count} nodes ({}%), {shortcut_total} shortcuts",
                    done * 100 / node_count
                ));
            }
        }

        info!(shortcuts = shortcut_total, "contraction finished");
        progress(&format!(
            "contraction finished: {node_count} nodes, {shortcut_total} shortcuts added"
        ));

        Ok(ContractionHierarchy {
            rank,
            order,
            forward: UpwardGraph::from_arcs(node_count, forward)?,
            backward: UpwardGraph::from_arcs(node_count, backward)?,
        })
    }
}
