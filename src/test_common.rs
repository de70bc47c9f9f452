//! Shared fixtures and naive reference implementations for tests.

use crate::graph::preprocess::{edge_ids, half_edges};
use crate::graph::{pack_edge, Csr, EdgeId, NodeId};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

/// Both directions of every pair, sorted and deduplicated.
pub(crate) fn symmetric_edges(pairs: &[(NodeId, NodeId)]) -> Vec<u64> {
    let mut edges = Vec::with_capacity(pairs.len() * 2);
    for &(u, v) in pairs {
        edges.push(pack_edge(u, v));
        edges.push(pack_edge(v, u));
    }
    edges.sort_unstable();
    edges.dedup();
    edges
}

pub(crate) fn clique(nodes: &[NodeId]) -> Vec<(NodeId, NodeId)> {
    let mut pairs = Vec::new();
    for i in 0..nodes.len() {
        for j in i + 1..nodes.len() {
            pairs.push((nodes[i], nodes[j]));
        }
    }
    pairs
}

/// Erdos-Renyi pairs with a fixed seed.
pub(crate) fn gnp(n: NodeId, p: f64, seed: u64) -> Vec<(NodeId, NodeId)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairs = Vec::new();
    for u in 0..n {
        for v in u + 1..n {
            if rng.gen_bool(p) {
                pairs.push((u, v));
            }
        }
    }
    pairs
}

/// Full CSR, half edges, half CSR, and the directed-to-half id map, built
/// through the real preprocessing path.
pub(crate) fn full_pipeline(
    pairs: &[(NodeId, NodeId)],
    threads: usize,
) -> (Csr, Vec<u64>, Csr, Vec<EdgeId>) {
    let edges = symmetric_edges(pairs);
    let full = Csr::from_full_edges(&edges, threads).unwrap();
    let half = half_edges(&edges, threads).unwrap();
    let half_csr = Csr::from_half_edges(&half, full.node_count(), threads).unwrap();
    let ids = edge_ids(&edges, &half_csr, threads).unwrap();
    (full, half, half_csr, ids)
}

fn adjacency(pairs: &[(NodeId, NodeId)]) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    let mut adj: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for &(u, v) in pairs {
        if u == v {
            continue;
        }
        adj.entry(u).or_default().insert(v);
        adj.entry(v).or_default().insert(u);
    }
    adj
}

/// Common-neighbour count per canonical edge.
pub(crate) fn naive_support(pairs: &[(NodeId, NodeId)]) -> BTreeMap<(NodeId, NodeId), u32> {
    let adj = adjacency(pairs);
    let mut sup = BTreeMap::new();
    for (&u, nu) in adj.iter() {
        for &v in nu.iter().filter(|&&v| v > u) {
            let common = nu.intersection(&adj[&v]).count() as u32;
            sup.insert((u, v), common);
        }
    }
    sup
}

/// Coreness by repeated minimum-degree removal.
pub(crate) fn naive_core(pairs: &[(NodeId, NodeId)]) -> BTreeMap<NodeId, u32> {
    let mut adj = adjacency(pairs);
    let mut core = BTreeMap::new();
    let mut k = 0u32;
    while let Some((&v, _)) = adj.iter().min_by_key(|(_, ns)| ns.len()) {
        k = k.max(adj[&v].len() as u32);
        core.insert(v, k);
        let ns: Vec<NodeId> = adj[&v].iter().copied().collect();
        for w in ns {
            if let Some(set) = adj.get_mut(&w) {
                set.remove(&v);
            }
        }
        adj.remove(&v);
    }
    core
}

/// Level-by-level truss decomposition with recomputed supports.
///
/// Returns the maximum k with a non-empty k-truss and the truss number of
/// every canonical edge (removal level plus 2).
pub(crate) fn naive_truss(
    pairs: &[(NodeId, NodeId)],
) -> (u32, BTreeMap<(NodeId, NodeId), u32>) {
    let mut adj = adjacency(pairs);
    let mut alive: BTreeSet<(NodeId, NodeId)> = pairs
        .iter()
        .filter(|&&(u, v)| u != v)
        .map(|&(u, v)| (u.min(v), u.max(v)))
        .collect();
    let mut truss = BTreeMap::new();
    let mut k_max = 0u32;
    let mut level = 0u32;

    while !alive.is_empty() {
        loop {
            let frontier: Vec<(NodeId, NodeId)> = alive
                .iter()
                .filter(|&&(u, v)| adj[&u].intersection(&adj[&v]).count() as u32 <= level)
                .copied()
                .collect();
            if frontier.is_empty() {
                break;
            }
            for (u, v) in frontier {
                truss.insert((u, v), level + 2);
                k_max = k_max.max(level + 2);
                alive.remove(&(u, v));
                adj.get_mut(&u).map(|s| s.remove(&v));
                adj.get_mut(&v).map(|s| s.remove(&u));
            }
        }
        level += 1;
    }
    (k_max, truss)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_truss_knows_the_classics() {
        let (k, t) = naive_truss(&[(0, 1), (0, 2), (1, 2)]);
        assert_eq!(k, 3);
        assert_eq!(t[&(0, 1)], 3);

        let (k, _) = naive_truss(&clique(&[0, 1, 2, 3, 4]));
        assert_eq!(k, 5);

        let mut pendant = clique(&[0, 1, 2, 3]);
        pendant.push((0, 4));
        let (k, t) = naive_truss(&pendant);
        assert_eq!(k, 4);
        assert_eq!(t[&(0, 4)], 2);
    }

    #[test]
    fn naive_core_knows_the_classics() {
        let core = naive_core(&clique(&[0, 1, 2, 3]));
        assert_eq!(core[&0], 3);
        let core = naive_core(&[(0, 1), (1, 2)]);
        assert_eq!(core[&1], 1);
    }
}
