//! Driver-row population of record and slice handles.
//!
//! This is the interface side of the scan collaborator: the caller runs
//! the query and hands rows over; this module decodes them into cells and
//! writes the cells into the handle's arena. No I/O happens here.
//!
//! Columns are matched to fields by name, case-insensitively, because
//! unquoted identifiers come back from the server folded to lower case.

use tokio_postgres::Row;

use crate::dynamic::field::{FieldDef, FieldKind, FloatWidth, IntWidth};
use crate::dynamic::object::{Handle, Object, Repr};
use crate::dynamic::value::{Cell, Scalar};
use crate::error::{CraftError, CraftResult};
use crate::nullable::Nullable;

impl Handle {
    /// Populate a record handle from one driver row.
    ///
    /// Every field must have a matching column; per-column failures are
    /// reported as decode errors naming the field.
    pub fn scan_row(&self, row: &Row) -> CraftResult<()> {
        match &self.repr {
            Repr::Instance(cells) => {
                let decoded = decode_row(&self.object, row)?;
                *cells.borrow_mut() = decoded;
                Ok(())
            }
            Repr::Element { rows, row: index } => {
                let decoded = decode_row(&self.object, row)?;
                let mut rows = rows.borrow_mut();
                let cells = rows
                    .get_mut(*index)
                    .ok_or_else(|| CraftError::handle("element handle outlived its slice row"))?;
                *cells = decoded;
                Ok(())
            }
            other => Err(CraftError::handle(format!(
                "scan_row on a {} handle; expected a record",
                other.describe()
            ))),
        }
    }

    /// Append one record per driver row to a slice handle.
    pub fn scan_rows(&self, rows: &[Row]) -> CraftResult<()> {
        if !matches!(&self.repr, Repr::Slice(_)) {
            return Err(CraftError::handle(format!(
                "scan_rows on a {} handle; expected a slice",
                self.repr.describe()
            )));
        }
        let mut decoded = Vec::with_capacity(rows.len());
        for row in rows {
            decoded.push(decode_row(&self.object, row)?);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(rows = decoded.len(), "scanned rows into slice");
        self.push_rows(decoded)
    }
}

fn decode_row(object: &Object, row: &Row) -> CraftResult<Vec<Cell>> {
    let mut cells = Vec::with_capacity(object.field_count());
    for def in object.fields() {
        let idx = column_index(row, def.name()).ok_or_else(|| {
            CraftError::decode(def.name(), "no matching column in the result row")
        })?;
        cells.push(decode_cell(def, row, idx)?);
    }
    Ok(cells)
}

fn column_index(row: &Row, name: &str) -> Option<usize> {
    row.columns()
        .iter()
        .position(|col| col.name().eq_ignore_ascii_case(name))
}

fn decode_cell(def: &FieldDef, row: &Row, idx: usize) -> CraftResult<Cell> {
    let decode_err = |e: tokio_postgres::Error| CraftError::decode(def.name(), e.to_string());

    if def.nullable() {
        let scalar = match def.kind() {
            FieldKind::Int(_) => row
                .try_get::<_, Nullable<i64>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Int8),
            FieldKind::Float(_) => row
                .try_get::<_, Nullable<f64>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Float8),
            FieldKind::Bool => row
                .try_get::<_, Nullable<bool>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Bool),
            FieldKind::Text => row
                .try_get::<_, Nullable<String>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Text),
            FieldKind::Timestamp => row
                .try_get::<_, Nullable<chrono::DateTime<chrono::Utc>>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Timestamp),
            FieldKind::Point => row
                .try_get::<_, Nullable<geo_types::Point<f64>>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Point),
            FieldKind::Json => row
                .try_get::<_, Nullable<serde_json::Value>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Json),
            FieldKind::Int8Array => row
                .try_get::<_, Nullable<Vec<i64>>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Int8Array),
            FieldKind::Float8Array => row
                .try_get::<_, Nullable<Vec<f64>>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::Float8Array),
            FieldKind::BoolArray => row
                .try_get::<_, Nullable<Vec<bool>>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::BoolArray),
            FieldKind::TextArray => row
                .try_get::<_, Nullable<Vec<String>>>(idx)
                .map_err(decode_err)?
                .map_scalar(Scalar::TextArray),
        };
        return Ok(Cell::Null(scalar));
    }

    let scalar = match def.kind() {
        FieldKind::Int(IntWidth::W16) => Scalar::Int2(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Int(IntWidth::W32) => Scalar::Int4(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Int(IntWidth::W64) => Scalar::Int8(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Float(FloatWidth::W32) => Scalar::Float4(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Float(FloatWidth::W64) => Scalar::Float8(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Bool => Scalar::Bool(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Text => Scalar::Text(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Timestamp => Scalar::Timestamp(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Point => Scalar::Point(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Json => Scalar::Json(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Int8Array => Scalar::Int8Array(row.try_get(idx).map_err(decode_err)?),
        FieldKind::Float8Array => Scalar::Float8Array(row.try_get(idx).map_err(decode_err)?),
        FieldKind::BoolArray => Scalar::BoolArray(row.try_get(idx).map_err(decode_err)?),
        FieldKind::TextArray => Scalar::TextArray(row.try_get(idx).map_err(decode_err)?),
    };
    Ok(Cell::Plain(scalar))
}

impl<T> Nullable<T> {
    /// Re-tag the payload while preserving validity.
    fn map_scalar(self, wrap: impl FnOnce(T) -> Scalar) -> Nullable<Scalar> {
        Nullable {
            value: wrap(self.value),
            valid: self.valid,
        }
    }
}
