//! Dotted positional paths into an order tree.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Position of a node in an order tree.
///
/// The first index selects a root item; after that indices alternate
/// between an item's ingredient groups and a group's selected items.
/// Printed and parsed as dotted text, e.g. `0.1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Creates a path from raw indices.
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Path of a root item.
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    /// Returns this path extended by one child index.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the path ends on an ingredient group rather than an item.
    pub fn points_to_group(&self) -> bool {
        !self.0.is_empty() && self.0.len() % 2 == 0
    }
}

impl FromStr for NodePath {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_found = || OrderError::PathNotFound {
            path: s.to_string(),
        };

        if s.is_empty() {
            return Err(not_found());
        }

        s.split('.')
            .map(|part| part.parse::<usize>().map_err(|_| not_found()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for index in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{index}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for NodePath {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
