//! Edge-list ingestion: a whitespace-separated text file becomes the sorted
//! packed edge array the engine consumes.
//!
//! The file is memory-mapped and split at line boundaries into one chunk per
//! worker. Each line carries two node ids; `#` and `%` lines are comments,
//! columns past the second are ignored. Both directions of every edge are
//! emitted, then the whole array is sorted and deduplicated. Self-loops are
//! dropped.

use crate::error::TrussError;
use crate::graph::{pack_edge, NodeId};

use crossbeam::thread;
use log::debug;
use memmap2::Mmap;
use rayon::slice::ParallelSliceMut;
use std::fs::File;
use std::path::Path;

/// Reads and parses an edge-list file.
pub fn load_edges<P: AsRef<Path>>(path: P) -> Result<Vec<u64>, TrussError> {
    let file = File::open(path.as_ref())?;
    let map = unsafe { Mmap::map(&file)? };
    parse_edge_list(&map)
}

/// Parses edge-list bytes into the sorted, deduplicated, both-directions
/// packed array.
pub fn parse_edge_list(bytes: &[u8]) -> Result<Vec<u64>, TrussError> {
    let threads = num_cpus::get_physical().max(1);
    let chunk = bytes.len().div_ceil(threads);

    // chunk boundaries aligned to line starts
    let mut bounds = Vec::with_capacity(threads + 1);
    bounds.push(0);
    for t in 1..threads {
        let mut at = (t * chunk).min(bytes.len());
        while at < bytes.len() && bytes[at - 1] != b'\n' {
            at += 1;
        }
        bounds.push(at);
    }
    bounds.push(bytes.len());

    let parts = thread::scope(|scope| -> Result<Vec<(Vec<u64>, usize)>, TrussError> {
        let mut workers = Vec::with_capacity(threads);
        for t in 0..threads {
            let begin = bounds[t];
            let end = bounds[t + 1];
            workers.push(scope.spawn(move |_| parse_chunk(bytes, begin, end)));
        }
        let mut parts = Vec::with_capacity(threads);
        for w in workers {
            parts.push(
                w.join()
                    .map_err(|_| TrussError::invariant("parser worker panicked"))??,
            );
        }
        Ok(parts)
    })
    .map_err(|_| TrussError::invariant("parser scope panicked"))??;

    let total: usize = parts.iter().map(|(v, _)| v.len()).sum();
    let self_loops: usize = parts.iter().map(|(_, l)| l).sum();
    let mut edges = Vec::new();
    edges
        .try_reserve_exact(total)
        .map_err(|_| TrussError::Allocation(total * std::mem::size_of::<u64>()))?;
    for (part, _) in parts {
        edges.extend(part);
    }
    if self_loops > 0 {
        debug!("dropped {self_loops} self-loop lines");
    }

    edges.par_sort_unstable();
    let before = edges.len();
    edges.dedup();
    if edges.len() < before {
        debug!("dropped {} duplicate directed edges", before - edges.len());
    }
    Ok(edges)
}

fn parse_chunk(bytes: &[u8], begin: usize, end: usize) -> Result<(Vec<u64>, usize), TrussError> {
    let mut out = Vec::new();
    let mut self_loops = 0usize;
    let mut at = begin;
    while at < end {
        let eol = bytes[at..end]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(end, |p| at + p);
        let line = &bytes[at..eol];
        let line_at = at;
        at = eol + 1;

        if line.is_empty() || line[0] == b'#' || line[0] == b'%' || line == b"\r" {
            continue;
        }
        let mut pos = 0usize;
        let u = parse_node(line, &mut pos, line_at)?;
        let v = parse_node(line, &mut pos, line_at)?;
        if u == v {
            self_loops += 1;
            continue;
        }
        out.push(pack_edge(u, v));
        out.push(pack_edge(v, u));
    }
    Ok((out, self_loops))
}

fn parse_node(line: &[u8], pos: &mut usize, line_at: usize) -> Result<NodeId, TrussError> {
    while *pos < line.len() && matches!(line[*pos], b' ' | b'\t' | b'\r') {
        *pos += 1;
    }
    let start = *pos;
    let mut val = 0u64;
    while *pos < line.len() && line[*pos].is_ascii_digit() {
        val = val * 10 + (line[*pos] - b'0') as u64;
        if val > NodeId::MAX as u64 {
            return Err(TrussError::Parse {
                offset: line_at + start,
                msg: "node id exceeds 32 bits".into(),
            });
        }
        *pos += 1;
    }
    if *pos == start {
        let tail = &line[start..line.len().min(start + 8)];
        return Err(TrussError::Parse {
            offset: line_at + start,
            msg: format!(
                "expected an integer, found {:?}",
                String::from_utf8_lossy(tail)
            ),
        });
    }
    Ok(val as NodeId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge_src;
    use std::io::Write;

    #[test]
    fn parses_plain_pairs() {
        let edges = parse_edge_list(b"0 1\n1 2\n0 2\n").unwrap();
        assert_eq!(
            edges,
            vec![
                pack_edge(0, 1),
                pack_edge(0, 2),
                pack_edge(1, 0),
                pack_edge(1, 2),
                pack_edge(2, 0),
                pack_edge(2, 1),
            ]
        );
    }

    #[test]
    fn skips_comments_blank_lines_and_extra_columns() {
        let text = b"# snap header\n% mtx header\n\n0\t1\t13.5\n1 2 weight\n";
        let edges = parse_edge_list(text).unwrap();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[0], pack_edge(0, 1));
    }

    #[test]
    fn drops_self_loops_and_duplicates() {
        let edges = parse_edge_list(b"3 3\n0 1\n1 0\n0 1\n").unwrap();
        assert_eq!(edges, vec![pack_edge(0, 1), pack_edge(1, 0)]);
    }

    #[test]
    fn missing_second_column_is_a_parse_error() {
        assert!(matches!(
            parse_edge_list(b"0 1\n2\n"),
            Err(TrussError::Parse { .. })
        ));
    }

    #[test]
    fn garbage_token_is_a_parse_error() {
        assert!(matches!(
            parse_edge_list(b"0 x\n"),
            Err(TrussError::Parse { .. })
        ));
    }

    #[test]
    fn node_id_overflow_is_a_parse_error() {
        assert!(matches!(
            parse_edge_list(b"0 4294967296\n"),
            Err(TrussError::Parse { .. })
        ));
    }

    #[test]
    fn no_trailing_newline_still_parses() {
        let edges = parse_edge_list(b"0 1").unwrap();
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn loads_from_a_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "# triangle").unwrap();
        writeln!(f, "0 1").unwrap();
        writeln!(f, "0 2").unwrap();
        writeln!(f, "1 2").unwrap();
        f.flush().unwrap();
        let edges = load_edges(f.path()).unwrap();
        assert_eq!(edges.len(), 6);
        assert_eq!(edge_src(edges[5]), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_edges("/definitely/not/here.txt"),
            Err(TrussError::Io(_))
        ));
    }
}
