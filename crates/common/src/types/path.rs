// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dotted coordinate of a node in the trace tree
///
/// The root frame is `"0"`; the `i`-th child of a node at `p` lives at `p.i`.
/// A path is assigned once, when the node is appended, and never renumbered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TracePath(String);

impl TracePath {
    /// Path of the root frame
    pub fn root() -> Self {
        Self("0".to_string())
    }

    /// Path of the child appended at `index` under this node
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}.{index}", self.0))
    }

    /// Path of the parent node, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once('.').map(|(parent, _)| Self(parent.to_string()))
    }

    /// Nesting level, 0 for the root
    pub fn depth(&self) -> usize {
        self.0.matches('.').count()
    }

    /// Child indices from the root down to this node (the root's own `0` is skipped)
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.split('.').skip(1).filter_map(|segment| segment.parse().ok())
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.0 == "0"
    }

    /// Borrow the dotted string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TracePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for TracePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TracePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TracePath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TracePath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
