//! The built contraction hierarchy and its self-check.

use std::path::Path;

use chprep_core::validate::check_graph_valid;
use chprep_core::{BuilderError, Hierarchy};

use crate::artifact;

/// `middle` value of an arc that was present in the input graph.
pub const NO_MIDDLE: u32 = u32::MAX;

/// CSR graph whose every arc leads from a lower to a higher rank.
///
/// Indexed by node id. `middle[a]` is the node a shortcut bypasses, or
/// [`NO_MIDDLE`] for an input arc.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpwardGraph {
    pub first_out: Vec<u32>,
    pub head: Vec<u32>,
    pub weight: Vec<u32>,
    pub middle: Vec<u32>,
}

impl UpwardGraph {
    /// Build from `(tail, head, weight, middle)` tuples.
    pub(crate) fn from_arcs(
        node_count: usize,
        mut arcs: Vec<(u32, u32, u32, u32)>,
    ) -> Result<Self, BuilderError> {
        if u32::try_from(arcs.len()).is_err() {
            return Err(BuilderError::InconsistentInput(format!(
                "{} upward arcs do not fit 32-bit offsets",
                arcs.len()
            )));
        }
        arcs.sort_by_key(|&(tail, head, _, _)| (tail, head));

        let mut first_out = vec![0_u32; node_count + 1];
        for &(tail, ..) in &arcs {
            first_out[tail as usize + 1] += 1;
        }
        for v in 0..node_count {
            first_out[v + 1] += first_out[v];
        }

        Ok(Self {
            first_out,
            head: arcs.iter().map(|a| a.1).collect(),
            weight: arcs.iter().map(|a| a.2).collect(),
            middle: arcs.iter().map(|a| a.3).collect(),
        })
    }

    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.head.len()
    }

    #[must_use]
    pub fn shortcut_count(&self) -> usize {
        self.middle.iter().filter(|&&m| m != NO_MIDDLE).count()
    }

    /// `(head, weight, middle)` of every arc leaving `v`.
    pub fn arcs_of(&self, v: usize) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let range = self.first_out[v] as usize..self.first_out[v + 1] as usize;
        range.map(move |a| (self.head[a], self.weight[a], self.middle[a]))
    }
}

/// Contraction order plus the upward search graphs.
///
/// `forward` holds input-direction arcs `v -> x`; `backward` holds
/// reversed arcs, so `v -> u` there stands for the input arc `u -> v`.
/// In both, the tail ranks below the head.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContractionHierarchy {
    /// `rank[v]` is the position at which `v` was contracted.
    pub rank: Vec<u32>,
    /// Inverse of `rank`.
    pub order: Vec<u32>,
    pub forward: UpwardGraph,
    pub backward: UpwardGraph,
}

impl ContractionHierarchy {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.rank.len()
    }

    #[must_use]
    pub fn shortcut_count(&self) -> usize {
        self.forward.shortcut_count() + self.backward.shortcut_count()
    }

    /// Read an artifact written by [`Hierarchy::save`].
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Io`] if the file cannot be read and
    /// [`BuilderError::Corrupt`] if it fails checksum or layout checks.
    pub fn load(path: &Path) -> Result<Self, BuilderError> {
        artifact::load(path)
    }

    fn check_rank(&self) -> Result<(), String> {
        let n = self.node_count();
        if self.order.len() != n {
            return Err(format!("order has {} entries for {n} nodes", self.order.len()));
        }
        for (v, &r) in self.rank.iter().enumerate() {
            if r as usize >= n {
                return Err(format!("rank of node {v} is {r}, out of range"));
            }
            if self.order[r as usize] as usize != v {
                return Err(format!("order and rank disagree at node {v}"));
            }
        }
        Ok(())
    }

    fn check_upward(&self, label: &str, graph: &UpwardGraph) -> Result<(), String> {
        let n = self.node_count();
        if graph.first_out.len() != n + 1 {
            return Err(format!(
                "{label} first_out has {} entries, expected {}",
                graph.first_out.len(),
                n + 1
            ));
        }
        check_graph_valid(&graph.first_out, &graph.head).map_err(|e| format!("{label}: {e}"))?;
        if graph.weight.len() != graph.arc_count() || graph.middle.len() != graph.arc_count() {
            return Err(format!("{label} arc arrays differ in length"));
        }

        for tail in 0..n {
            let tail_rank = self.rank[tail];
            for (head, _, middle) in graph.arcs_of(tail) {
                let head_rank = self.rank[head as usize];
                if tail_rank >= head_rank {
                    return Err(format!(
                        "{label} arc {tail} -> {head} does not lead upward ({tail_rank} >= {head_rank})"
                    ));
                }
                if middle != NO_MIDDLE {
                    let below = self
                        .rank
                        .get(middle as usize)
                        .is_some_and(|&m| m < tail_rank);
                    if !below {
                        return Err(format!(
                            "{label} shortcut {tail} -> {head} bypasses node {middle} which is not ranked below it"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Hierarchy for ContractionHierarchy {
    fn self_check(&self) -> Result<(), BuilderError> {
        self.check_rank()
            .and_then(|()| self.check_upward("forward", &self.forward))
            .and_then(|()| self.check_upward("backward", &self.backward))
            .map_err(BuilderError::SelfCheck)
    }

    fn save(&self, path: &Path) -> Result<(), BuilderError> {
        artifact::save(self, path)
    }
}
