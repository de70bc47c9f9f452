//! Per-edge triangle counting over the canonical half graph.

use crate::error::TrussError;
use crate::graph::Csr;
use crate::utils::try_vec_with;

use crossbeam::thread;
use portable_atomic::{AtomicU32, Ordering};

/// Counts, for every half edge, the number of triangles containing it.
///
/// Workers split the node range; for each half edge `(u,v)` the tail of u's
/// half adjacency past v is merge-walked against v's half adjacency. Both
/// lists hold only larger neighbours, so every match is a canonical
/// `u < v < w` triangle, enumerated exactly once at its smallest vertex.
/// Walk positions are half-edge indices, which is where the +1 lands for
/// all three sides.
pub fn count_support(half: &Csr, threads: usize) -> Result<Vec<AtomicU32>, TrussError> {
    let m = half.edge_count();
    let sup = try_vec_with(m, |_| AtomicU32::new(0))?;
    if m == 0 {
        return Ok(sup);
    }
    let threads = threads.max(1);
    let n = half.node_count();
    let load = n.div_ceil(threads);
    let offsets = half.offsets();
    let adj = half.adj();

    thread::scope(|scope| {
        let sup = &sup;
        for tid in 0..threads {
            let begin = (tid * load).min(n);
            let end = (begin + load).min(n);
            scope.spawn(move |_| {
                for u in begin..end {
                    let u_off = offsets[u];
                    let nu = &adj[u_off..offsets[u + 1]];
                    for (j, &v) in nu.iter().enumerate() {
                        let v_off = offsets[v as usize];
                        let nv = &adj[v_off..offsets[v as usize + 1]];
                        let (mut p, mut q) = (j + 1, 0);
                        while p < nu.len() && q < nv.len() {
                            match nu[p].cmp(&nv[q]) {
                                std::cmp::Ordering::Less => p += 1,
                                std::cmp::Ordering::Greater => q += 1,
                                std::cmp::Ordering::Equal => {
                                    sup[u_off + j].fetch_add(1, Ordering::Relaxed);
                                    sup[u_off + p].fetch_add(1, Ordering::Relaxed);
                                    sup[v_off + q].fetch_add(1, Ordering::Relaxed);
                                    p += 1;
                                    q += 1;
                                }
                            }
                        }
                    }
                }
            });
        }
    })
    .map_err(|_| TrussError::invariant("support scope panicked"))?;

    Ok(sup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{edge_dst, edge_src};
    use crate::test_common::{clique, full_pipeline, gnp, naive_support, symmetric_edges};

    fn supports(pairs: &[(u32, u32)], threads: usize) -> (Vec<u64>, Vec<u32>) {
        let (_, half, half_csr, _) = full_pipeline(pairs, threads);
        let sup = count_support(&half_csr, threads).unwrap();
        (half, sup.into_iter().map(AtomicU32::into_inner).collect())
    }

    #[test]
    fn triangle_edges_have_support_one() {
        let (_, sup) = supports(&[(0, 1), (0, 2), (1, 2)], 2);
        assert_eq!(sup, vec![1, 1, 1]);
    }

    #[test]
    fn k4_edges_have_support_two() {
        let (_, sup) = supports(&clique(&[0, 1, 2, 3]), 2);
        assert_eq!(sup, vec![2; 6]);
    }

    #[test]
    fn star_has_no_triangles() {
        let (_, sup) = supports(&[(0, 1), (0, 2), (0, 3), (0, 4)], 2);
        assert_eq!(sup, vec![0; 4]);
    }

    #[test]
    fn pendant_edge_has_zero_support() {
        let mut pairs = clique(&[0, 1, 2, 3]);
        pairs.push((0, 4));
        let (half, sup) = supports(&pairs, 2);
        for (j, &e) in half.iter().enumerate() {
            let expected = if edge_dst(e) == 4 { 0 } else { 2 };
            assert_eq!(sup[j], expected, "edge {:?}", (edge_src(e), edge_dst(e)));
        }
    }

    #[test]
    fn matches_naive_counts_on_random_graphs() {
        for seed in [1, 23, 456] {
            let pairs = gnp(45, 0.18, seed);
            if pairs.is_empty() {
                continue;
            }
            let (half, sup) = supports(&pairs, 4);
            let naive = naive_support(&pairs);
            for (j, &e) in half.iter().enumerate() {
                let key = (edge_src(e), edge_dst(e));
                assert_eq!(sup[j], naive[&key], "edge {key:?} seed {seed}");
            }
        }
    }

    #[test]
    fn total_support_is_three_per_triangle() {
        // two disjoint triangles: 6 half edges, 2 triangles
        let edges = symmetric_edges(&[(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5)]);
        let pairs: Vec<(u32, u32)> = edges
            .iter()
            .filter(|&&e| edge_src(e) < edge_dst(e))
            .map(|&e| (edge_src(e), edge_dst(e)))
            .collect();
        let (_, sup) = supports(&pairs, 2);
        assert_eq!(sup.iter().sum::<u32>(), 6);
    }
}
