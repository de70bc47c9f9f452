//! Bucket-based k-core decomposition (Batagelj and Zaversnik).
//!
//! Nodes are bin-sorted by degree, then peeled in nondecreasing order of
//! current degree; each peel decrements its surviving neighbours and swaps
//! them into the right bucket in constant time. The degree histogram is
//! built in parallel, the peel itself is the sequential linear sweep.

use crate::error::TrussError;
use crate::graph::{Csr, NodeId};
use crate::shared_slice::SharedSliceMut;
use crate::utils::try_vec;

use crossbeam::thread;

/// Coreness of every node: `core[v]` is the largest k such that v belongs
/// to the k-core.
#[derive(Debug)]
pub struct KCore {
    pub core: Vec<NodeId>,
    pub max_core: NodeId,
}

impl KCore {
    pub fn decompose(g: &Csr, threads: usize) -> Result<Self, TrussError> {
        let n = g.node_count();
        if n == 0 {
            return Ok(KCore {
                core: Vec::new(),
                max_core: 0,
            });
        }
        let threads = threads.max(1);
        let load = n.div_ceil(threads);

        let mut degree: Vec<NodeId> = try_vec(0, n)?;
        let deg_slice = SharedSliceMut::of(&mut degree);

        // current degrees plus the merged degree histogram
        let mut bins: Vec<usize> = thread::scope(|scope| {
            let mut workers = Vec::with_capacity(threads);
            for tid in 0..threads {
                let mut deg = deg_slice;
                let begin = (tid * load).min(n);
                let end = (begin + load).min(n);
                workers.push(scope.spawn(move |_| {
                    let mut bins: Vec<usize> = Vec::new();
                    for v in begin..end {
                        let d = g.degree(v);
                        *deg.get_mut(v) = d as NodeId;
                        if d >= bins.len() {
                            bins.resize(d + 1, 0);
                        }
                        bins[d] += 1;
                    }
                    bins
                }));
            }
            let mut merged: Vec<usize> = Vec::new();
            for w in workers {
                let part = w.join().unwrap_or_default();
                if part.len() > merged.len() {
                    merged.resize(part.len(), 0);
                }
                for (d, c) in part.into_iter().enumerate() {
                    merged[d] += c;
                }
            }
            merged
        })
        .map_err(|_| TrussError::invariant("degree histogram scope panicked"))?;

        // prefix sum: bins[d] becomes the start of the degree-d bucket
        let mut start = 0usize;
        for b in bins.iter_mut() {
            let count = *b;
            *b = start;
            start += count;
        }

        // vert holds nodes ordered by degree, pos the inverse permutation
        let mut vert: Vec<NodeId> = try_vec(0, n)?;
        let mut pos: Vec<usize> = try_vec(0, n)?;
        for v in 0..n {
            let d = degree[v] as usize;
            vert[bins[d]] = v as NodeId;
            pos[v] = bins[d];
            bins[d] += 1;
        }
        for d in (1..bins.len()).rev() {
            bins[d] = bins[d - 1];
        }
        bins[0] = 0;

        let mut core: Vec<NodeId> = try_vec(0, n)?;
        for i in 0..n {
            let v = vert[i] as usize;
            let dv = degree[v];
            core[v] = dv;
            for &w in g.neighbours(v) {
                let w = w as usize;
                let dw = degree[w];
                if dw > dv {
                    // swap w to the front of its bucket, then shrink the bucket
                    let pw = pos[w];
                    let front = bins[dw as usize];
                    let x = vert[front] as usize;
                    if w != x {
                        vert[pw] = x as NodeId;
                        pos[x] = pw;
                        vert[front] = w as NodeId;
                        pos[w] = front;
                    }
                    bins[dw as usize] += 1;
                    degree[w] = dw - 1;
                }
            }
        }

        let max_core = core.iter().copied().max().unwrap_or(0);
        Ok(KCore { core, max_core })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::{clique, gnp, naive_core, symmetric_edges};

    fn decompose(pairs: &[(NodeId, NodeId)], threads: usize) -> KCore {
        let edges = symmetric_edges(pairs);
        let g = Csr::from_full_edges(&edges, threads).unwrap();
        KCore::decompose(&g, threads).unwrap()
    }

    #[test]
    fn empty_graph_has_no_cores() {
        let g = Csr::from_full_edges(&[], 2).unwrap();
        let k = KCore::decompose(&g, 2).unwrap();
        assert_eq!(k.max_core, 0);
        assert!(k.core.is_empty());
    }

    #[test]
    fn path_is_one_core() {
        let k = decompose(&[(0, 1), (1, 2), (2, 3)], 2);
        assert_eq!(k.core, vec![1, 1, 1, 1]);
        assert_eq!(k.max_core, 1);
    }

    #[test]
    fn clique_core_is_size_minus_one() {
        let k = decompose(&clique(&[0, 1, 2, 3, 4]), 2);
        assert_eq!(k.core, vec![4; 5]);
        assert_eq!(k.max_core, 4);
    }

    #[test]
    fn pendant_node_peels_first() {
        // K4 plus the pendant edge (0,4)
        let mut pairs = clique(&[0, 1, 2, 3]);
        pairs.push((0, 4));
        let k = decompose(&pairs, 2);
        assert_eq!(k.core, vec![3, 3, 3, 3, 1]);
        assert_eq!(k.max_core, 3);
    }

    #[test]
    fn matches_naive_on_random_graphs() {
        for seed in [3, 17, 99] {
            let pairs = gnp(50, 0.12, seed);
            if pairs.is_empty() {
                continue;
            }
            let k = decompose(&pairs, 4);
            let naive = naive_core(&pairs);
            for (&v, &c) in naive.iter() {
                assert_eq!(k.core[v as usize], c, "node {v} seed {seed}");
            }
        }
    }

    #[test]
    fn single_thread_agrees_with_many() {
        let pairs = gnp(60, 0.1, 5);
        let a = decompose(&pairs, 1);
        let b = decompose(&pairs, 8);
        assert_eq!(a.core, b.core);
    }
}
