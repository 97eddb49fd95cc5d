//! Bounded Dijkstra used to decide whether a shortcut is needed.
//!
//! A search from `u` that avoids `v` and finds `x` within `w(u,v) + w(v,x)`
//! proves the path through `v` is not the only shortest one. Searches stop
//! early once the distance bound or the settle limit is reached; an
//! inconclusive search simply yields an extra, harmless shortcut.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;

use crate::contraction::Edge;

const UNREACHED: u64 = u64::MAX;

/// Reusable search state; buffers are reset lazily between runs.
pub(crate) struct WitnessSearch {
    dist: Vec<u64>,
    settled: FixedBitSet,
    touched: Vec<u32>,
    heap: BinaryHeap<Reverse<(u64, u32)>>,
    settle_limit: usize,
}

impl WitnessSearch {
    pub(crate) fn new(node_count: usize, settle_limit: usize) -> Self {
        Self {
            dist: vec![UNREACHED; node_count],
            settled: FixedBitSet::with_capacity(node_count),
            touched: Vec::new(),
            heap: BinaryHeap::new(),
            settle_limit,
        }
    }

    /// Search from `source` over `out`, never entering `skip`, until every
    /// node within `bound` is settled or the settle limit is hit.
    pub(crate) fn run(&mut self, out: &[Vec<Edge>], source: u32, skip: u32, bound: u64) {
        self.reset();
        self.relax(source, 0);

        let mut settled = 0_usize;
        while let Some(Reverse((d, node))) = self.heap.pop() {
            if self.settled.contains(node as usize) || d > self.dist[node as usize] {
                continue;
            }
            if d > bound || settled >= self.settle_limit {
                break;
            }
            self.settled.insert(node as usize);
            settled += 1;

            for edge in &out[node as usize] {
                if edge.to != skip {
                    self.relax(edge.to, d + u64::from(edge.weight));
                }
            }
        }
    }

    /// Tentative distance to `node` from the last search's source.
    pub(crate) fn distance(&self, node: u32) -> u64 {
        self.dist[node as usize]
    }

    fn relax(&mut self, node: u32, d: u64) {
        let slot = &mut self.dist[node as usize];
        if d < *slot {
            if *slot == UNREACHED {
                self.touched.push(node);
            }
            *slot = d;
            self.heap.push(Reverse((d, node)));
        }
    }

    fn reset(&mut self) {
        for node in self.touched.drain(..) {
            self.dist[node as usize] = UNREACHED;
            self.settled.set(node as usize, false);
        }
        self.heap.clear();
    }
}
