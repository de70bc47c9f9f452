//! k-truss machinery: triangle support counting, bounded peeling, the
//! orchestrator, and the spectrum reporter.

pub mod max_truss;
pub mod peel;
pub mod support;

use crate::graph::NodeId;

use crossbeam::thread;

/// Edge counts per truss number at or above `min_k`, plus the largest such
/// truss number with a positive count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrussStats {
    pub k_max: NodeId,
    pub counts: Vec<(NodeId, u64)>,
}

/// Folds a frozen support vector into the truss spectrum. An edge removed at
/// level L has truss number L + 2; entries below `min_k` are not reported
/// (they are approximate after a bulk pre-kill).
pub fn truss_stats(edges_sup: &[u32], min_k: NodeId, threads: usize) -> TrussStats {
    if edges_sup.is_empty() {
        return TrussStats::default();
    }
    let threads = threads.max(1);
    let load = edges_sup.len().div_ceil(threads);

    let hist: Vec<u64> = thread::scope(|scope| {
        let mut workers = Vec::with_capacity(threads);
        for tid in 0..threads {
            let begin = (tid * load).min(edges_sup.len());
            let end = (begin + load).min(edges_sup.len());
            workers.push(scope.spawn(move |_| {
                let mut part: Vec<u64> = Vec::new();
                for &s in &edges_sup[begin..end] {
                    let k = s as usize + 2;
                    if k >= part.len() {
                        part.resize(k + 1, 0);
                    }
                    part[k] += 1;
                }
                part
            }));
        }
        let mut hist: Vec<u64> = Vec::new();
        for w in workers {
            let part = w.join().unwrap_or_default();
            if part.len() > hist.len() {
                hist.resize(part.len(), 0);
            }
            for (k, c) in part.into_iter().enumerate() {
                hist[k] += c;
            }
        }
        hist
    })
    .unwrap_or_default();

    let mut stats = TrussStats::default();
    for (k, &c) in hist.iter().enumerate().skip(min_k.max(2) as usize) {
        if c > 0 {
            stats.k_max = k as NodeId;
            stats.counts.push((k as NodeId, c));
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_support_reports_zero() {
        let s = truss_stats(&[], 2, 2);
        assert_eq!(s.k_max, 0);
        assert!(s.counts.is_empty());
    }

    #[test]
    fn spectrum_counts_per_truss_number() {
        // supports 0,0,2,2,2,3 are truss numbers 2,2,4,4,4,5
        let s = truss_stats(&[0, 0, 2, 2, 2, 3], 2, 2);
        assert_eq!(s.k_max, 5);
        assert_eq!(s.counts, vec![(2, 2), (4, 3), (5, 1)]);
    }

    #[test]
    fn min_k_hides_lower_levels() {
        let s = truss_stats(&[0, 0, 2, 2, 2, 3], 4, 2);
        assert_eq!(s.k_max, 5);
        assert_eq!(s.counts, vec![(4, 3), (5, 1)]);
    }

    #[test]
    fn all_below_min_k_means_zero() {
        let s = truss_stats(&[0, 1, 1], 4, 2);
        assert_eq!(s.k_max, 0);
        assert!(s.counts.is_empty());
    }

    #[test]
    fn thread_count_does_not_change_the_histogram() {
        let sup: Vec<u32> = (0..997).map(|i| (i * 7 % 13) as u32).collect();
        assert_eq!(truss_stats(&sup, 2, 1), truss_stats(&sup, 2, 8));
    }
}
