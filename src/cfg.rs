//! Control-flow graph model.
//!
//! A CFG maps every node id to its ordered successor list. Nodes with an empty
//! list are terminal. The maximum out-degree sizes the neighbor registers of
//! the trace.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AttestError, Result};

/// Value used to right-pad neighbor lists up to the maximum out-degree.
pub const NEIGHBOR_PADDING: u64 = 0;

/// Control-flow graph stored as ordered adjacency lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cfg {
    succ: BTreeMap<u64, Vec<u64>>,
    max_adjacency: usize,
}

impl Cfg {
    /// Builds a CFG from `(node, successors)` pairs.
    ///
    /// A node listed twice keeps its last successor list. Every destination
    /// must itself be declared as a node, possibly with no successors.
    pub fn from_adjacency<I>(adjacency: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u64, Vec<u64>)>,
    {
        let succ: BTreeMap<u64, Vec<u64>> = adjacency.into_iter().collect();

        for (&node, dests) in &succ {
            if let Some(&destination) = dests.iter().find(|d| !succ.contains_key(d)) {
                return Err(AttestError::UndefinedDestination { node, destination });
            }
        }

        let max_adjacency = succ.values().map(Vec::len).max().unwrap_or(0);
        Ok(Self { succ, max_adjacency })
    }

    /// Loads a CFG from a file of `"<src> <dest1> <dest2> ..."` lines.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        std::fs::read_to_string(path)?.parse()
    }

    pub fn len(&self) -> usize {
        self.succ.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succ.is_empty()
    }

    pub fn contains(&self, node: u64) -> bool {
        self.succ.contains_key(&node)
    }

    /// Node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = u64> + '_ {
        self.succ.keys().copied()
    }

    /// Largest declared node id, if any.
    pub fn max_node(&self) -> Option<u64> {
        self.succ.keys().next_back().copied()
    }

    /// Maximum out-degree over all nodes.
    pub fn max_adjacency(&self) -> usize {
        self.max_adjacency
    }

    /// Declared successor list of `node`, unpadded.
    pub fn successors(&self, node: u64) -> Result<&[u64]> {
        self.succ
            .get(&node)
            .map(Vec::as_slice)
            .ok_or(AttestError::UnknownNode { node, step: None })
    }

    /// Successor list padded with [`NEIGHBOR_PADDING`] to exactly
    /// [`max_adjacency`](Self::max_adjacency) entries.
    pub fn neighbors(&self, node: u64) -> Result<Vec<u64>> {
        let mut neighbors = self.successors(node)?.to_vec();
        neighbors.resize(self.max_adjacency, NEIGHBOR_PADDING);
        Ok(neighbors)
    }

    /// Nodes that have `node` among their successors, in ascending order.
    pub fn predecessors(&self, node: u64) -> Vec<u64> {
        self.succ
            .iter()
            .filter(|(_, dests)| dests.contains(&node))
            .map(|(&src, _)| src)
            .collect()
    }

    /// Every edge `(src, dest)`, duplicates included.
    pub fn edges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.succ
            .iter()
            .flat_map(|(&src, dests)| dests.iter().map(move |&dest| (src, dest)))
    }

    pub fn has_edge(&self, src: u64, dest: u64) -> bool {
        self.succ
            .get(&src)
            .is_some_and(|dests| dests.contains(&dest))
    }
}

impl FromStr for Cfg {
    type Err = AttestError;

    /// Parses one `"<src> <dest1> <dest2> ..."` line per node. Blank lines
    /// and `#` comments are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let mut adjacency = Vec::new();

        for (lineno, raw) in s.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(src) = tokens.next() else { continue };
            let src = parse_node(src, lineno + 1)?;
            let dests = tokens
                .map(|tok| parse_node(tok, lineno + 1))
                .collect::<Result<Vec<_>>>()?;
            adjacency.push((src, dests));
        }

        Self::from_adjacency(adjacency)
    }
}

pub(crate) fn parse_node(token: &str, line: usize) -> Result<u64> {
    token.parse::<u64>().map_err(|e| AttestError::Parse {
        line,
        message: format!("invalid node '{token}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    //      0
    //     / \
    //    1   2
    //    |   |
    //    3   4
    //    |
    //    5
    fn diamond() -> Cfg {
        Cfg::from_adjacency([
            (0, vec![1, 2]),
            (1, vec![3]),
            (2, vec![4]),
            (3, vec![5]),
            (4, vec![]),
            (5, vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn max_adjacency_is_max_out_degree() {
        assert_eq!(diamond().max_adjacency(), 2);
        let empty = Cfg::from_adjacency([(0, vec![])]).unwrap();
        assert_eq!(empty.max_adjacency(), 0);
    }

    #[test]
    fn neighbors_are_padded_to_max_adjacency() {
        let cfg = diamond();
        assert_eq!(cfg.neighbors(0).unwrap(), vec![1, 2]);
        assert_eq!(cfg.neighbors(1).unwrap(), vec![3, NEIGHBOR_PADDING]);
        assert_eq!(cfg.neighbors(5).unwrap(), vec![NEIGHBOR_PADDING; 2]);
    }

    #[test]
    fn unknown_node_is_rejected() {
        let err = diamond().neighbors(42).unwrap_err();
        assert!(matches!(err, AttestError::UnknownNode { node: 42, .. }));
    }

    #[test]
    fn undefined_destination_is_rejected() {
        let err = Cfg::from_adjacency([(0, vec![1])]).unwrap_err();
        assert!(matches!(
            err,
            AttestError::UndefinedDestination {
                node: 0,
                destination: 1
            }
        ));
    }

    #[test]
    fn duplicate_successors_are_kept() {
        let cfg = Cfg::from_adjacency([(0, vec![1, 1]), (1, vec![])]).unwrap();
        assert_eq!(cfg.max_adjacency(), 2);
        assert_eq!(cfg.edges().count(), 2);
    }

    #[test]
    fn edges_and_predecessors() {
        let cfg = diamond();
        let edges: Vec<_> = cfg.edges().collect();
        assert_eq!(edges, vec![(0, 1), (0, 2), (1, 3), (2, 4), (3, 5)]);
        assert_eq!(cfg.predecessors(3), vec![1]);
        assert!(cfg.has_edge(2, 4));
        assert!(!cfg.has_edge(4, 2));
        assert_eq!(cfg.max_node(), Some(5));
    }

    #[test]
    fn parses_text_format() {
        let cfg: Cfg = "0 1 2\n1 3\n2 4\n3 5 # exit\n\n4\n5\n".parse().unwrap();
        assert_eq!(cfg, diamond());
    }

    #[test]
    fn rejects_garbage_tokens() {
        let err = "0 1\n1 x\n".parse::<Cfg>().unwrap_err();
        assert!(matches!(err, AttestError::Parse { line: 2, .. }));
    }
}
