//! # pgcraft
//!
//! Composable SQL statement construction and runtime row-shape synthesis
//! for PostgreSQL.
//!
//! ## Features
//!
//! - **Expression AST**: a closed node hierarchy that renders itself into
//!   parameterized SQL text with `$n` placeholders computed at render time
//! - **Recipes**: a fluent accumulator assembling SELECT/INSERT/UPDATE/
//!   DELETE statements from read columns, write assignments, conditions,
//!   and auxiliary clauses
//! - **Tagged placeholders**: reference one bound value several times in
//!   one statement without re-sending it
//! - **Dynamic objects**: record, slice, and patch shapes synthesized at
//!   configuration time from a field list, with generic accessors that
//!   never panic on misuse
//! - **Nullable wrappers**: value + validity pairs that persist as SQL
//!   NULL and serialize to explicit JSON `null`
//!
//! ## Building a statement
//!
//! ```ignore
//! use pgcraft::{sql, Expr};
//!
//! let q = sql()
//!     .read("id")
//!     .read("name")
//!     .and_where(Expr::column("status").eq(Expr::placeholder()))
//!     .select(["users"])?;
//! // SELECT id,name FROM users WHERE ((status=$1))
//! ```
//!
//! ## Dynamic result shapes
//!
//! ```ignore
//! use pgcraft::{FieldDef, Object};
//!
//! let obj = Object::new([
//!     FieldDef::int("id", false, false, 64)?,
//!     FieldDef::text("name", true, true)?,
//! ])?;
//! let rows = obj.create_slice();
//! // hand `rows` to the scan collaborator, then:
//! // rows.elem(0)?.field("name")?
//! ```

pub mod dynamic;
pub mod error;
pub mod nullable;
pub mod recipe;

pub use dynamic::{Cell, FieldDef, FieldKind, FieldValue, Handle, Object, Scalar};
pub use error::{CraftError, CraftResult};
pub use nullable::{NullDefault, Nullable};
pub use recipe::{
    Clause, Direction, Expr, Lit, LogicalOp, OnConflict, OrderBy, Param, ParamList, Recipe,
    RelationRef, RenderContext, SchemaRef, Source, WriteMode, prepare_parameters, sql,
};
