// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Operation and node kinds understood by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A matrix operation the engine can split into row tasks.
///
/// Serialized as its operator symbol: `+`, `*`, `-` or `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Element-wise sum of two matrices of equal shape.
    #[serde(rename = "+")]
    Add,
    /// Matrix product.
    #[serde(rename = "*")]
    Multiply,
    /// Element-wise negation.
    #[serde(rename = "-")]
    Negate,
    /// Swap rows and columns.
    #[serde(rename = "T")]
    Transpose,
}

impl OperationKind {
    /// Every operation, in declaration order.
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Add,
        OperationKind::Multiply,
        OperationKind::Negate,
        OperationKind::Transpose,
    ];

    /// Number of operands the operation takes.
    pub fn arity(self) -> usize {
        match self {
            OperationKind::Add | OperationKind::Multiply => 2,
            OperationKind::Negate | OperationKind::Transpose => 1,
        }
    }

    /// Whether chains of this operation may be regrouped.
    pub fn is_associative(self) -> bool {
        matches!(self, OperationKind::Add | OperationKind::Multiply)
    }

    /// The operator symbol used in expression files.
    pub fn symbol(self) -> &'static str {
        match self {
            OperationKind::Add => "+",
            OperationKind::Multiply => "*",
            OperationKind::Negate => "-",
            OperationKind::Transpose => "T",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Add => "ADD",
            OperationKind::Multiply => "MULTIPLY",
            OperationKind::Negate => "NEGATE",
            OperationKind::Transpose => "TRANSPOSE",
        };
        f.write_str(name)
    }
}

/// What an expression node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A resolved matrix.
    Matrix,
    /// An operation over child nodes.
    Operation(OperationKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        let arities: Vec<usize> = OperationKind::ALL.iter().map(|k| k.arity()).collect();
        assert_eq!(arities, vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_symbols_match_serde_names() {
        for kind in OperationKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.symbol()));
        }
        let parsed: OperationKind = serde_json::from_str("\"T\"").unwrap();
        assert_eq!(parsed, OperationKind::Transpose);
        assert!(serde_json::from_str::<OperationKind>("\"/\"").is_err());
    }
}
