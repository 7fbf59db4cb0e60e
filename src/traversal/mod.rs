//! Traversal API
//!
//! - [`GraphFactory`] opens a [`Graph`] from a [`crate::config::GraphConfig`]
//! - [`Graph::traversal`] hands out a [`GraphTraversalSource`] (`g`)
//! - steps chained on `g` form a [`Traversal`], filtered with [`P`]
//! - `g.tx()` commits or rolls back the implicit transaction

pub mod graph;
pub mod predicate;
pub mod source;
pub mod step;

pub use graph::{Features, Graph, GraphFactory};
pub use predicate::P;
pub use source::{GraphTraversalSource, Tx};
pub use step::{Traversal, Traverser};
