//! Plain-text edge lists.
//!
//! One edge per line, `src dst [weight]`, separated by whitespace or commas.
//! Blank lines and lines starting with `#` or `%` are skipped, so
//! SNAP-style files and the body of Matrix Market coordinate files both
//! parse. Either every edge carries a weight or none does.

use crate::graph_error::GraphError;
use crate::topology::graph::RawEdgeList;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeListReader {
    /// Ids in the file start at 1 (Matrix Market); shift them to 0.
    pub one_based: bool,
    /// Add the reverse of every edge.
    pub undirected: bool,
    /// Skip the first non-comment line (a Matrix Market size line).
    pub skip_header: bool,
}

impl EdgeListReader {
    pub fn matrix_market() -> Self {
        Self {
            one_based: true,
            undirected: false,
            skip_header: true,
        }
    }

    fn parse_id(&self, raw: &str, line_no: usize) -> Result<u64, GraphError> {
        let id: u64 = raw
            .parse()
            .map_err(|_| GraphError::MalformedDataset(format!("line {line_no}: invalid vertex id {raw:?}")))?;
        if self.one_based {
            id.checked_sub(1).ok_or_else(|| {
                GraphError::MalformedDataset(format!("line {line_no}: vertex id 0 in a 1-based file"))
            })
        } else {
            Ok(id)
        }
    }

    pub fn read<R: Read>(&self, reader: R) -> Result<RawEdgeList, GraphError> {
        let mut edges = Vec::new();
        let mut weights: Vec<f32> = Vec::new();
        let mut weighted: Option<bool> = None;
        let mut header_pending = self.skip_header;

        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
                continue;
            }
            if header_pending {
                header_pending = false;
                continue;
            }
            let fields: Vec<&str> = trimmed
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();
            let (src, dst, weight) = match fields.as_slice() {
                [s, d] => (s, d, None),
                [s, d, w] => (s, d, Some(w)),
                _ => {
                    return Err(GraphError::MalformedDataset(format!(
                        "line {line_no}: expected `src dst [weight]`, got {trimmed:?}"
                    )));
                }
            };
            let has_weight = weight.is_some();
            if *weighted.get_or_insert(has_weight) != has_weight {
                return Err(GraphError::MalformedDataset(format!(
                    "line {line_no}: weighted and unweighted edges are mixed"
                )));
            }
            edges.push((self.parse_id(src, line_no)?, self.parse_id(dst, line_no)?));
            if let Some(w) = weight {
                let w: f32 = w
                    .parse()
                    .map_err(|_| GraphError::MalformedDataset(format!("line {line_no}: invalid weight {w:?}")))?;
                weights.push(w);
            }
        }

        if self.undirected {
            let reversed: Vec<_> = edges.iter().map(|&(u, v)| (v, u)).collect();
            edges.extend(reversed);
            weights.extend_from_within(..);
        }
        log::debug!("read {} edges (weighted: {})", edges.len(), weighted == Some(true));

        let raw = RawEdgeList::new(edges);
        Ok(if weighted == Some(true) { raw.with_weights(weights) } else { raw })
    }
}

/// Parse an in-memory 0-based edge list.
pub fn parse_edge_list(text: &str) -> Result<RawEdgeList, GraphError> {
    EdgeListReader::default().read(text.as_bytes())
}

/// Read a 0-based edge list file.
pub fn read_edge_list<P: AsRef<Path>>(path: P) -> Result<RawEdgeList, GraphError> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| GraphError::Io(format!("{}: {e}", path.as_ref().display())))?;
    EdgeListReader::default().read(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_separators() {
        let g = parse_edge_list("# snap\n0 1\n\n1,2\n% mm\n2\t0\n").unwrap();
        assert_eq!(g.edges, vec![(0, 1), (1, 2), (2, 0)]);
        assert!(g.weights.is_none());
    }

    #[test]
    fn weights_are_all_or_nothing() {
        let g = parse_edge_list("0 1 0.5\n1 2 2\n").unwrap();
        assert_eq!(g.weights, Some(vec![0.5, 2.0]));
        assert!(matches!(
            parse_edge_list("0 1 0.5\n1 2\n"),
            Err(GraphError::MalformedDataset(_))
        ));
    }

    #[test]
    fn matrix_market_body() {
        let text = "%%MatrixMarket matrix coordinate pattern general\n3 3 2\n1 2\n3 1\n";
        let g = EdgeListReader::matrix_market().read(text.as_bytes()).unwrap();
        assert_eq!(g.edges, vec![(0, 1), (2, 0)]);
        let zero = EdgeListReader::matrix_market().read("3 3 1\n0 1\n".as_bytes());
        assert!(zero.is_err());
    }

    #[test]
    fn undirected_mirrors_weights() {
        let r = EdgeListReader {
            undirected: true,
            ..EdgeListReader::default()
        };
        let g = r.read("0 1 1.5\n".as_bytes()).unwrap();
        assert_eq!(g.edges, vec![(0, 1), (1, 0)]);
        assert_eq!(g.weights, Some(vec![1.5, 1.5]));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(parse_edge_list("0 x\n").is_err());
        assert!(parse_edge_list("0 1 2 3\n").is_err());
        assert!(matches!(read_edge_list("/nonexistent/edges.txt"), Err(GraphError::Io(_))));
    }
}
