//! Statement recipes: a composable expression AST plus a fluent builder
//! that assembles SELECT/INSERT/UPDATE/DELETE text with `$n` placeholders.
//!
//! Parameter indices are assigned by a per-statement [`RenderContext`] at
//! render time (there is no string replacement), and tagged placeholders
//! let one bound value appear several times in one statement.
//!
//! ```ignore
//! use pgcraft::{sql, Expr, OrderBy};
//!
//! let q = sql()
//!     .read("id")
//!     .read(Expr::column("total").alias("t"))
//!     .and_where(Expr::column("status").eq(Expr::placeholder()))
//!     .add_clause(OrderBy::new().desc(["id"]))
//!     .select(["orders"])?;
//! ```

mod clause;
mod context;
mod expr;
mod param;
mod stmt;

pub use clause::{Clause, Direction, OnConflict, OrderBy};
pub use context::{RenderContext, WriteMode};
pub use expr::{Expr, Lit, LogicalOp, RelationRef, SchemaRef};
pub use param::{Param, ParamList, Source, prepare_parameters};
pub use stmt::Recipe;

/// Start an empty recipe.
pub fn sql() -> Recipe {
    Recipe::new()
}

#[cfg(test)]
mod tests;
