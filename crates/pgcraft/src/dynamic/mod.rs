//! Runtime-synthesized record shapes.
//!
//! Queries built at runtime need result shapes built at runtime. This
//! module turns an ordered list of [`FieldDef`] descriptors into an
//! [`Object`], and an object into opaque [`Handle`]s over three shapes:
//!
//! - a **record** (one cell per field, nullable fields wrapped),
//! - a **slice** of records, grown by the scan collaborator,
//! - a **patch** (editable fields only, each member optionally set; the
//!   partial-update representation).
//!
//! Handles carry generic accessors (`field`, `set_field`, `elem`, `len`)
//! that fail with descriptive errors instead of panicking, plus JSON
//! encode/decode and driver-row scanning.
//!
//! ```ignore
//! use pgcraft::{FieldDef, Object};
//!
//! let obj = Object::new([
//!     FieldDef::int("id", false, false, 64)?,
//!     FieldDef::text("name", true, true)?,
//! ])?;
//!
//! let rows = obj.create_slice();
//! // ... external collaborator executes a query and calls rows.scan_rows(..)
//! let first = rows.elem(0)?;
//! let name = first.field("name")?;
//! ```

mod field;
mod object;
mod patch;
mod scan;
mod value;

pub use field::{FieldDef, FieldKind, FloatWidth, IntWidth};
pub use object::{FieldValue, Handle, Object};
pub use value::{Cell, Scalar};
