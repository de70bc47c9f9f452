//! Graph reduction, the canonical half graph, and the directed-to-half edge
//! id map.
//!
//! All three are order-preserving parallel passes over a sorted edge array:
//! count per chunk, prefix the counts, then write each chunk at its offset.

use crate::error::TrussError;
use crate::graph::{edge_dst, edge_src, Csr, EdgeId, NodeId};
use crate::shared_slice::SharedSliceMut;
use crate::utils::try_vec;

use crossbeam::thread;

/// Keeps the edges whose endpoints both have coreness at least
/// `start_k - 1`. Any edge of a k-truss lies in a (k-1)-core, so the
/// filter cannot lose a k-truss with k >= start_k.
pub fn reduce_edges(
    raw: &[u64],
    core: &[NodeId],
    start_k: NodeId,
    threads: usize,
) -> Result<Vec<u64>, TrussError> {
    let keep = start_k.saturating_sub(1);
    filter_edges(raw, threads, |e| {
        core[edge_src(e) as usize] >= keep && core[edge_dst(e) as usize] >= keep
    })
}

/// Keeps the canonical (src < dst) orientation of every undirected edge.
pub fn half_edges(edges: &[u64], threads: usize) -> Result<Vec<u64>, TrussError> {
    filter_edges(edges, threads, |e| edge_src(e) < edge_dst(e))
}

fn filter_edges(
    edges: &[u64],
    threads: usize,
    keep: impl Fn(u64) -> bool + Sync,
) -> Result<Vec<u64>, TrussError> {
    let threads = threads.max(1);
    let load = edges.len().div_ceil(threads);

    let mut counts = vec![0usize; threads + 1];
    thread::scope(|scope| {
        let keep = &keep;
        let mut workers = Vec::with_capacity(threads);
        for tid in 0..threads {
            let begin = (tid * load).min(edges.len());
            let end = (begin + load).min(edges.len());
            workers.push(scope.spawn(move |_| edges[begin..end].iter().filter(|&&e| keep(e)).count()));
        }
        for (tid, w) in workers.into_iter().enumerate() {
            counts[tid + 1] = w.join().unwrap_or(0);
        }
    })
    .map_err(|_| TrussError::invariant("filter count scope panicked"))?;

    for tid in 1..=threads {
        counts[tid] += counts[tid - 1];
    }
    let total = counts[threads];
    let mut out = try_vec(0u64, total)?;
    let slots = SharedSliceMut::of(&mut out);

    thread::scope(|scope| {
        let keep = &keep;
        for tid in 0..threads {
            let mut slots = slots;
            let mut at = counts[tid];
            let begin = (tid * load).min(edges.len());
            let end = (begin + load).min(edges.len());
            scope.spawn(move |_| {
                for &e in &edges[begin..end] {
                    if keep(e) {
                        *slots.get_mut(at) = e;
                        at += 1;
                    }
                }
            });
        }
    })
    .map_err(|_| TrussError::invariant("filter write scope panicked"))?;

    Ok(out)
}

/// Maps every directed edge to the index of its canonical half edge, so both
/// orientations share one support counter. The canonical edge is found by
/// binary search inside the half-CSR slot of the smaller endpoint; a miss
/// means the input was not mirror-symmetric.
pub fn edge_ids(edges: &[u64], half: &Csr, threads: usize) -> Result<Vec<EdgeId>, TrussError> {
    let threads = threads.max(1);
    let mut ids = try_vec(0 as EdgeId, edges.len())?;
    let out = SharedSliceMut::of(&mut ids);
    let load = edges.len().div_ceil(threads);

    thread::scope(|scope| -> Result<(), TrussError> {
        let mut workers = Vec::with_capacity(threads);
        for tid in 0..threads {
            let mut out = out;
            let begin = (tid * load).min(edges.len());
            let end = (begin + load).min(edges.len());
            workers.push(scope.spawn(move |_| -> Result<(), TrussError> {
                for i in begin..end {
                    let e = edges[i];
                    let (u, v) = (edge_src(e), edge_dst(e));
                    let (lo, hi) = if u < v { (u, v) } else { (v, u) };
                    let slot = half.neighbours(lo as usize);
                    let at = slot.partition_point(|&w| w < hi);
                    if at >= slot.len() || slot[at] != hi {
                        return Err(TrussError::invalid(format!(
                            "edge ({u},{v}) has no canonical half edge; a mirror is missing"
                        )));
                    }
                    *out.get_mut(i) = half.offsets()[lo as usize] + at;
                }
                Ok(())
            }));
        }
        for w in workers {
            w.join()
                .map_err(|_| TrussError::invariant("edge id worker panicked"))??;
        }
        Ok(())
    })
    .map_err(|_| TrussError::invariant("edge id scope panicked"))??;

    Ok(ids)
}
