// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

use crate::types::NodeId;

/// Errors reported by structural document edits and markup parsing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomError {
    /// The handle refers to a node that has been removed.
    #[error("stale node id {0:?}")]
    Stale(NodeId),
    /// The operation needs an element but the node is text.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// Inserting the child would make a node its own ancestor.
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Prospective parent.
        parent: NodeId,
        /// Node being inserted.
        child: NodeId,
    },
    /// The reference node for an insertion is not a child of the parent.
    #[error("{reference:?} is not a child of {parent:?}")]
    NotAChild {
        /// Parent the insertion targeted.
        parent: NodeId,
        /// Reference node that was expected among its children.
        reference: NodeId,
    },
    /// The document root cannot be moved or removed.
    #[error("the document root cannot be moved or removed")]
    Root,
    /// The markup could not be tokenized.
    #[error("failed to parse markup: {0}")]
    Parse(String),
}

/// A selector used syntax outside the supported subset.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported selector `{0}`")]
pub struct SelectorError(pub String);
