//! Orchestrates the full pipeline: k-core, optional coreness pruning, CSR
//! and half-graph construction, triangle counting, peeling, reporting.

use crate::error::TrussError;
use crate::graph::preprocess::{edge_ids, half_edges, reduce_edges};
use crate::graph::{Csr, NodeId};
use crate::k_core::KCore;
use crate::k_truss::peel::peel;
use crate::k_truss::support::count_support;
use crate::k_truss::{truss_stats, TrussStats};
use crate::utils::Clock;

use log::info;
use portable_atomic::AtomicU32;

/// Outcome of a maximum k-truss run.
#[derive(Debug, Clone)]
pub struct TrussResult {
    /// Largest k for which a non-empty k-truss exists; 0 on an empty graph.
    pub k_max: NodeId,
    /// Edge counts per truss number for the committed pass, ascending.
    /// After a pruned pass the lowest bucket sits on the peeling floor and
    /// may absorb edges whose exact truss number is lower; an unpruned
    /// pass is exact throughout.
    pub spectrum: Vec<(NodeId, u64)>,
    /// Final per-half-edge support of the committed pass, frozen at the
    /// removal level (truss number minus 2).
    pub edges_sup: Vec<u32>,
}

impl TrussResult {
    fn empty() -> Self {
        TrussResult {
            k_max: 0,
            spectrum: Vec::new(),
            edges_sup: Vec::new(),
        }
    }
}

/// Maximum k-truss engine over a pre-sorted symmetric packed edge array.
pub struct MaxTruss {
    raw_edges: Option<Vec<u64>>,
    threads: usize,
}

impl MaxTruss {
    /// Takes ownership of the edge array; it is released once a pass
    /// consumes it.
    pub fn new(raw_edges: Vec<u64>) -> Self {
        MaxTruss {
            raw_edges: Some(raw_edges),
            threads: num_cpus::get_physical().max(1),
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Computes the maximum k-truss.
    ///
    /// With `remove` unset this is a single exact pass over the whole
    /// graph. With `remove` set, the run starts from a coreness-derived
    /// guess `start_k` and keeps only edges whose endpoints have coreness
    /// at least `start_k - 1`, peeling from the matching level. Every
    /// level strictly above that floor is exact, so a report of
    /// k > start_k is committed. At or below the guess the lowest bucket
    /// may have absorbed edges of smaller truss, so the guess is
    /// tightened and the pass repeats; the guess shrinks strictly and a
    /// pass at start_k = 2 is exact.
    pub fn compute(mut self, remove: bool) -> Result<TrussResult, TrussError> {
        let raw = self.raw_edges.take().unwrap_or_default();
        if raw.is_empty() {
            return Ok(TrussResult::empty());
        }

        let mut clock = Clock::start("kcore");
        let raw_csr = Csr::from_full_edges(&raw, self.threads)?;
        let cores = KCore::decompose(&raw_csr, self.threads)?;
        drop(raw_csr);
        clock.tick(&format!("max core {}", cores.max_core));

        let mut raw = Some(raw);
        let mut start_k: NodeId = if remove {
            (cores.max_core / 2 + 2).max(2)
        } else {
            2
        };

        loop {
            match self.run_pass(&mut raw, &cores.core, start_k)? {
                None => {
                    // pruning emptied the graph; the guess overshot
                    if start_k <= 2 {
                        return Ok(TrussResult::empty());
                    }
                    start_k = 2;
                }
                Some(res) => {
                    info!("pass at startK {start_k}: kmax {}", res.k_max);
                    if start_k <= 2 || res.k_max > start_k {
                        return Ok(res);
                    }
                    start_k = res.k_max.clamp(2, start_k - 1);
                }
            }
        }
    }

    fn run_pass(
        &self,
        raw: &mut Option<Vec<u64>>,
        core: &[NodeId],
        start_k: NodeId,
    ) -> Result<Option<TrussResult>, TrussError> {
        let mut clock = Clock::start("pass");
        let edges: Vec<u64> = if start_k <= 2 {
            // exact pass: the raw array is consumed outright
            raw.take()
                .ok_or_else(|| TrussError::invariant("raw edges consumed before an exact pass"))?
        } else {
            match raw.as_ref() {
                Some(r) => reduce_edges(r, core, start_k, self.threads)?,
                None => return Err(TrussError::invariant("raw edges gone before a pruned pass")),
            }
        };
        if edges.is_empty() {
            return Ok(None);
        }
        clock.tick(&format!("startK {start_k}: {} directed edges", edges.len()));

        let full = Csr::from_full_edges(&edges, self.threads)?;
        let half = half_edges(&edges, self.threads)?;
        let half_csr = Csr::from_half_edges(&half, full.node_count(), self.threads)?;
        let ids = edge_ids(&edges, &half_csr, self.threads)?;
        drop(edges);
        clock.tick(&format!("preprocess: {} half edges", half.len()));

        let sup = count_support(&half_csr, self.threads)?;
        clock.tick("triangle count");

        peel(&full, &ids, &half, &sup, start_k.saturating_sub(2), self.threads)?;
        clock.tick("peel");

        drop(full);
        drop(half_csr);
        drop(ids);
        drop(half);

        let edges_sup: Vec<u32> = sup.into_iter().map(AtomicU32::into_inner).collect();
        let TrussStats { k_max, counts } = truss_stats(&edges_sup, start_k.max(2), self.threads);
        Ok(Some(TrussResult {
            k_max,
            spectrum: counts,
            edges_sup,
        }))
    }
}
