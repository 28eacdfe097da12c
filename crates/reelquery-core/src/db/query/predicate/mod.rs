//! Filter predicate language: AST, schema validation, normalization and
//! reference evaluation.

mod ast;
pub(crate) mod eval;
mod normalize;
mod validate;

#[cfg(test)]
mod tests;

// re-exports
pub use ast::{CaseMode, CompareOp, ComparePredicate, Predicate, Quantifier, RelationPredicate};
pub use eval::{Row, eval};
pub use normalize::normalize;
pub use validate::{ValidateError, validate};

pub(crate) use validate::validate_join;
