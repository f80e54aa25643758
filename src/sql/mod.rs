//! SQL compilation.
//!
//! - `builder`: validates operation descriptors and compiles them to
//!   statements with named parameters
//! - `statement`: statement types and rendering to positional placeholders

pub mod builder;
pub mod statement;

pub use builder::{CompiledOperation, QueryBuilder};
pub use statement::{BoundStatement, Parameter, SqlStatement, is_select};
