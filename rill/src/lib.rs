//! Semantic core for the Rill language
//!
//! Lowers parsed declarations into a type model and a scope-chained symbol
//! table: a closed [`types::TypeKind`] sum with orthogonal const/array
//! modifiers, an arena-allocated scope tree, generic templates with lazy
//! bodies, and first-match generic specialization.

pub mod ast;
pub mod error;
pub mod sema;
pub mod symtab;
pub mod types;

pub use ast::Span;
pub use error::{CompileError, Result};
