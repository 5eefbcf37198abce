//! Condition language for index queries
//!
//! A small textual front end that turns conditions into [`IndexOperator`]
//! trees for one index:
//!
//! - **AST**: conditions and comparison operators
//! - **Parser**: parse condition strings (nom)
//! - **Plan**: lower conditions onto an index's field list
//!
//! # Example
//!
//! ```rust,ignore
//! use docindex::query::compile;
//!
//! let fields = vec!["age".to_string()];
//! let operator = compile("age >= 5 AND age <= 10", &fields)?;
//! let matches: Vec<_> = index.scan(&operator)?.collect();
//! ```
//!
//! [`IndexOperator`]: crate::index::IndexOperator

mod ast;
mod error;
mod parser;
mod plan;

pub use ast::{Condition, Operator};
pub use error::{QueryError, QueryResult};
pub use parser::parse_conditions;
pub use plan::{compile, lower};
