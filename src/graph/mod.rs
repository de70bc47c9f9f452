//! Packed-edge primitives and the compressed-sparse-row graph.
//!
//! Every edge is a 64-bit value holding source in the high half and
//! destination in the low half, so a lexicographically sorted `u64` array is
//! already sorted by `(src, dst)`. The [`Csr`] owns its offset and adjacency
//! arrays together, so neither can be released without the other.

pub mod loader;
pub mod preprocess;

use crate::error::TrussError;
use crate::shared_slice::SharedSliceMut;
use crate::utils::try_vec;

use crossbeam::thread;

/// Node identifier. A packed edge holds two of these.
pub type NodeId = u32;
/// Index into an edge array. May exceed 2^32 on large graphs.
pub type EdgeId = usize;

#[inline(always)]
pub const fn pack_edge(src: NodeId, dst: NodeId) -> u64 {
    ((src as u64) << 32) | dst as u64
}

#[inline(always)]
pub const fn edge_src(edge: u64) -> NodeId {
    (edge >> 32) as NodeId
}

#[inline(always)]
pub const fn edge_dst(edge: u64) -> NodeId {
    edge as NodeId
}

/// Compressed-sparse-row adjacency over a sorted packed-edge array.
///
/// `offsets[v]..offsets[v + 1]` indexes the neighbours of `v` in `adj`, in
/// ascending order. For a half graph the positions in `adj` double as the
/// half-edge indices used by the support vector.
#[derive(Debug, Clone)]
pub struct Csr {
    node_count: usize,
    offsets: Vec<EdgeId>,
    adj: Vec<NodeId>,
}

impl Csr {
    /// Builds the CSR of a full symmetric edge array. The node count is
    /// taken from the largest source id. Rejects unsorted input, duplicate
    /// edges, self-loops, an odd edge count, and destinations beyond the
    /// node range (a symptom of a missing mirror edge).
    pub fn from_full_edges(edges: &[u64], threads: usize) -> Result<Self, TrussError> {
        if edges.is_empty() {
            return Ok(Csr {
                node_count: 0,
                offsets: vec![0],
                adj: Vec::new(),
            });
        }
        if edges.len() % 2 != 0 {
            return Err(TrussError::invalid(
                "symmetric edge array has an odd number of entries",
            ));
        }
        let node_count = edge_src(edges[edges.len() - 1]) as usize + 1;
        Self::validate(edges, node_count, true, threads)?;
        Self::build(edges, node_count, threads)
    }

    /// Builds the CSR of a half (canonically oriented) edge array over the
    /// full node id space, so offset lookups stay in range for every node
    /// of the originating graph.
    pub fn from_half_edges(
        edges: &[u64],
        node_count: usize,
        threads: usize,
    ) -> Result<Self, TrussError> {
        if edges.is_empty() {
            return Ok(Csr {
                node_count,
                offsets: vec![0; node_count + 1],
                adj: Vec::new(),
            });
        }
        Self::validate(edges, node_count, false, threads)?;
        Self::build(edges, node_count, threads)
    }

    fn validate(
        edges: &[u64],
        node_count: usize,
        symmetric: bool,
        threads: usize,
    ) -> Result<(), TrussError> {
        let threads = threads.max(1);
        let load = edges.len().div_ceil(threads);
        thread::scope(|scope| -> Result<(), TrussError> {
            let mut workers = Vec::with_capacity(threads);
            for tid in 0..threads {
                let begin = (tid * load).min(edges.len());
                let end = (begin + load).min(edges.len());
                workers.push(scope.spawn(move |_| -> Result<(), TrussError> {
                    for i in begin..end {
                        let e = edges[i];
                        let (u, v) = (edge_src(e), edge_dst(e));
                        if u == v {
                            return Err(TrussError::invalid(format!("self-loop at node {u}")));
                        }
                        if !symmetric && u > v {
                            return Err(TrussError::invalid(format!(
                                "half edge ({u},{v}) is not canonically oriented"
                            )));
                        }
                        if (u as usize) >= node_count || (v as usize) >= node_count {
                            return Err(TrussError::invalid(format!(
                                "edge ({u},{v}) reaches past node {}; a mirror edge is missing",
                                node_count - 1
                            )));
                        }
                        if i > 0 && edges[i - 1] >= e {
                            return Err(TrussError::invalid(
                                "edge array is unsorted or contains duplicates",
                            ));
                        }
                    }
                    Ok(())
                }));
            }
            for w in workers {
                w.join()
                    .map_err(|_| TrussError::invariant("validation worker panicked"))??;
            }
            Ok(())
        })
        .map_err(|_| TrussError::invariant("validation scope panicked"))?
    }

    /// Offsets come from one sorted-array rank query per node, adjacency is
    /// the destination column. Atomic-free; each worker owns a disjoint
    /// node and edge range.
    fn build(edges: &[u64], node_count: usize, threads: usize) -> Result<Self, TrussError> {
        let threads = threads.max(1);
        let mut offsets = try_vec(0 as EdgeId, node_count + 1)?;
        let mut adj = try_vec(0 as NodeId, edges.len())?;
        offsets[node_count] = edges.len();

        let node_load = node_count.div_ceil(threads);
        let edge_load = edges.len().div_ceil(threads);
        let off = SharedSliceMut::of(&mut offsets);
        let dst = SharedSliceMut::of(&mut adj);

        thread::scope(|scope| {
            for tid in 0..threads {
                let mut off = off;
                let mut dst = dst;
                let n_begin = (tid * node_load).min(node_count);
                let n_end = (n_begin + node_load).min(node_count);
                let e_begin = (tid * edge_load).min(edges.len());
                let e_end = (e_begin + edge_load).min(edges.len());
                scope.spawn(move |_| {
                    for v in n_begin..n_end {
                        *off.get_mut(v) = edges.partition_point(|&e| (edge_src(e) as usize) < v);
                    }
                    for i in e_begin..e_end {
                        *dst.get_mut(i) = edge_dst(edges[i]);
                    }
                });
            }
        })
        .map_err(|_| TrussError::invariant("csr build scope panicked"))?;

        Ok(Csr {
            node_count,
            offsets,
            adj,
        })
    }

    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline(always)]
    pub fn edge_count(&self) -> usize {
        self.adj.len()
    }

    #[inline(always)]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    #[inline(always)]
    pub fn neighbours(&self, v: usize) -> &[NodeId] {
        &self.adj[self.offsets[v]..self.offsets[v + 1]]
    }

    #[inline(always)]
    pub fn offsets(&self) -> &[EdgeId] {
        &self.offsets
    }

    #[inline(always)]
    pub fn adj(&self) -> &[NodeId] {
        &self.adj
    }
}
