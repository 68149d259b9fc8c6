//! Edge-list files.
//!
//! One edge per line, two whitespace-separated node labels; extra columns
//! (weights, timestamps) are ignored. Lines starting with `#` or `%` and
//! blank lines are skipped. Labels are arbitrary tokens and are mapped to
//! ids `0..n-1` in order of first appearance.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::{Graph, GraphBuilder};

/// Bidirectional mapping between file labels and node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLabels {
    labels: Vec<String>,
    ids: HashMap<String, usize>,
}

impl NodeLabels {
    /// Id of `label`, assigning the next free id if unseen.
    fn intern(&mut self, label: &str) -> usize {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(label.to_owned());
        self.ids.insert(label.to_owned(), id);
        id
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when no label was seen.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label of node `id`.
    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Node id of `label`.
    pub fn id(&self, label: &str) -> Option<usize> {
        self.ids.get(label).copied()
    }
}

/// A graph read from disk together with its label mapping.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    /// Graph over ids `0..n-1`.
    pub graph: Graph,
    /// Original labels of those ids.
    pub labels: NodeLabels,
}

/// Read an edge-list file.
pub fn read_edge_list(path: impl AsRef<Path>) -> Result<LoadedGraph> {
    let path = path.as_ref();
    let loaded = parse_edge_list(BufReader::new(File::open(path)?))?;
    debug!(
        path = %path.display(),
        nodes = loaded.graph.node_count(),
        edges = loaded.graph.edge_count(),
        "loaded edge list"
    );
    Ok(loaded)
}

/// Parse an edge list from any buffered reader.
///
/// Self-loops and repeated edges are dropped. A line with fewer than two
/// tokens is a [`Error::Parse`] error.
pub fn parse_edge_list<R: BufRead>(reader: R) -> Result<LoadedGraph> {
    let mut labels = NodeLabels::default();
    let mut pairs = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let (Some(a), Some(b)) = (tokens.next(), tokens.next()) else {
            return Err(Error::Parse {
                line: idx + 1,
                message: format!("expected two node labels, got {trimmed:?}"),
            });
        };
        let u = labels.intern(a);
        let v = labels.intern(b);
        pairs.push((u, v));
    }

    let mut builder = GraphBuilder::new(labels.len());
    for (u, v) in pairs {
        builder.add_edge(u, v);
    }
    Ok(LoadedGraph {
        graph: builder.build(),
        labels,
    })
}

/// Write `graph` as an edge list, one `u v` line per edge.
///
/// With `labels`, ids are written back as their original labels.
pub fn write_edge_list(
    path: impl AsRef<Path>,
    graph: &Graph,
    labels: Option<&NodeLabels>,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for (u, v) in graph.edges() {
        match labels.and_then(|l| Some((l.label(u)?, l.label(v)?))) {
            Some((a, b)) => writeln!(out, "{a} {b}")?,
            None => writeln!(out, "{u} {v}")?,
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_labels_first_appearance() {
        let text = "# comment\n10 20\n\n20 30 0.5\n% other comment\n30 10\n";
        let loaded = parse_edge_list(Cursor::new(text)).unwrap();
        assert_eq!(loaded.graph.node_count(), 3);
        assert_eq!(loaded.graph.edge_count(), 3);
        assert_eq!(loaded.labels.id("10"), Some(0));
        assert_eq!(loaded.labels.id("20"), Some(1));
        assert_eq!(loaded.labels.label(2), Some("30"));
    }

    #[test]
    fn test_parse_drops_loops_and_duplicates() {
        let loaded = parse_edge_list(Cursor::new("a b\nb a\na a\nc c\n")).unwrap();
        assert_eq!(loaded.graph.node_count(), 3);
        assert_eq!(loaded.graph.edge_count(), 1);
        assert_eq!(loaded.graph.degree(2), 0);
    }

    #[test]
    fn test_parse_error_line_number() {
        let r = parse_edge_list(Cursor::new("1 2\n# ok\nlonely\n"));
        assert!(matches!(r, Err(Error::Parse { line: 3, .. })));
    }

    #[test]
    fn test_parse_empty() {
        let loaded = parse_edge_list(Cursor::new("# nothing\n")).unwrap();
        assert_eq!(loaded.graph.node_count(), 0);
        assert!(loaded.labels.is_empty());
    }

    #[test]
    fn test_write_then_read_keeps_labels() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.txt");
        std::fs::write(&src, "x y\ny z\n").unwrap();
        let loaded = read_edge_list(&src).unwrap();

        let dst = dir.path().join("out.txt");
        write_edge_list(&dst, &loaded.graph, Some(&loaded.labels)).unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "x y\ny z\n");

        write_edge_list(&dst, &loaded.graph, None).unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "0 1\n1 2\n");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let r = read_edge_list("/definitely/not/here.txt");
        assert!(matches!(r, Err(Error::Io(_))));
    }
}
