//! Compressed-sparse-row graph.
//!
//! Vertex `v` owns the arc indices `first_out[v]..first_out[v + 1]`; `head`
//! and `weight` are indexed by arc. Vertex ids and arc indices are `u32`,
//! matching the width the builder consumes.

use std::ops::Range;

/// A directed graph in CSR form, as read from disk.
///
/// Construction performs no checks: run
/// [`validate_graph`](crate::validate::validate_graph) before trusting any
/// accessor that indexes through `first_out`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsrGraph {
    /// Vertex count declared by the input file.
    pub node_count: usize,
    /// Per-vertex offsets into `head`/`weight`, length `node_count + 1`.
    pub first_out: Vec<u32>,
    /// Destination vertex of every arc.
    pub head: Vec<u32>,
    /// Non-negative cost of every arc; the text format may truncate to 0.
    pub weight: Vec<u32>,
}

impl CsrGraph {
    #[must_use]
    pub const fn new(
        node_count: usize,
        first_out: Vec<u32>,
        head: Vec<u32>,
        weight: Vec<u32>,
    ) -> Self {
        Self {
            node_count,
            first_out,
            head,
            weight,
        }
    }

    /// Build a graph from an arc list, sorting arcs by source.
    ///
    /// Arcs with the same source keep their relative order.
    #[must_use]
    pub fn from_arcs(node_count: usize, arcs: &[(u32, u32, u32)]) -> Self {
        let mut sorted = arcs.to_vec();
        sorted.sort_by_key(|&(source, _, _)| source);

        let mut first_out = vec![0_u32; node_count + 1];
        for &(source, _, _) in &sorted {
            first_out[source as usize + 1] += 1;
        }
        for v in 0..node_count {
            first_out[v + 1] += first_out[v];
        }

        let head = sorted.iter().map(|&(_, h, _)| h).collect();
        let weight = sorted.iter().map(|&(_, _, w)| w).collect();
        Self::new(node_count, first_out, head, weight)
    }

    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.head.len()
    }

    /// Arc index range owned by vertex `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v >= node_count`.
    #[must_use]
    pub fn out_arcs(&self, v: usize) -> Range<usize> {
        self.first_out[v] as usize..self.first_out[v + 1] as usize
    }

    /// Tag every arc with its source vertex by inverting `first_out`.
    #[must_use]
    pub fn arc_sources(&self) -> Vec<u32> {
        invert_first_out(&self.first_out)
    }

    /// Iterate `(source, head, weight)` triples in CSR order.
    pub fn arcs(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        (0..self.node_count).flat_map(move |v| {
            self.out_arcs(v)
                .map(move |arc| (v as u32, self.head[arc], self.weight[arc]))
        })
    }
}

/// Expand a CSR offset array into one source id per arc.
///
/// The output length is the last entry of `first_out`. Empty ranges
/// contribute nothing; a non-monotone array yields the ranges that are
/// well formed.
#[must_use]
pub fn invert_first_out(first_out: &[u32]) -> Vec<u32> {
    let arc_count = first_out.last().copied().unwrap_or(0) as usize;
    let mut sources = Vec::with_capacity(arc_count);
    for (v, bounds) in first_out.windows(2).enumerate() {
        let count = bounds[1].saturating_sub(bounds[0]) as usize;
        sources.extend(std::iter::repeat_n(v as u32, count));
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_node_graph_tags_single_arc_with_source_zero() {
        let graph = CsrGraph::new(2, vec![0, 1, 1], vec![1], vec![7]);
        assert_eq!(graph.arc_sources(), vec![0]);
        assert_eq!(graph.arcs().collect::<Vec<_>>(), vec![(0, 1, 7)]);
    }

    #[test]
    fn inversion_skips_vertices_without_arcs() {
        let sources = invert_first_out(&[0, 0, 2, 2, 3]);
        assert_eq!(sources, vec![1, 1, 3]);
    }

    #[test]
    fn inversion_of_empty_offsets_is_empty() {
        assert!(invert_first_out(&[]).is_empty());
        assert!(invert_first_out(&[0]).is_empty());
    }

    #[test]
    fn from_arcs_groups_by_source() {
        let graph = CsrGraph::from_arcs(3, &[(2, 0, 4), (0, 1, 1), (0, 2, 3)]);
        assert_eq!(graph.first_out, vec![0, 2, 2, 3]);
        assert_eq!(graph.head, vec![1, 2, 0]);
        assert_eq!(graph.weight, vec![1, 3, 4]);
        assert_eq!(graph.out_arcs(1), 2..2);
    }
}
