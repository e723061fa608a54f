//! Runtime cell values for dynamic records.
//!
//! [`Scalar`] is the tagged union with one variant per field kind;
//! [`Cell`] is what a record member actually holds: a plain scalar for
//! non-nullable fields, a [`Nullable`] wrapper for nullable ones. Cells
//! implement [`ToSql`] so record members can feed bound queries directly.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use geo_types::Point;
use serde_json::{Value as Json, json};
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type};

use crate::dynamic::field::{FieldDef, FieldKind, FloatWidth, IntWidth};
use crate::error::{CraftError, CraftResult};
use crate::nullable::Nullable;

/// One value of any supported field kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
    Point(Point<f64>),
    Json(Json),
    Int8Array(Vec<i64>),
    Float8Array(Vec<f64>),
    BoolArray(Vec<bool>),
    TextArray(Vec<String>),
}

impl Scalar {
    /// The field kind this scalar belongs to.
    pub fn kind(&self) -> FieldKind {
        match self {
            Scalar::Int2(_) => FieldKind::Int(IntWidth::W16),
            Scalar::Int4(_) => FieldKind::Int(IntWidth::W32),
            Scalar::Int8(_) => FieldKind::Int(IntWidth::W64),
            Scalar::Float4(_) => FieldKind::Float(FloatWidth::W32),
            Scalar::Float8(_) => FieldKind::Float(FloatWidth::W64),
            Scalar::Bool(_) => FieldKind::Bool,
            Scalar::Text(_) => FieldKind::Text,
            Scalar::Timestamp(_) => FieldKind::Timestamp,
            Scalar::Point(_) => FieldKind::Point,
            Scalar::Json(_) => FieldKind::Json,
            Scalar::Int8Array(_) => FieldKind::Int8Array,
            Scalar::Float8Array(_) => FieldKind::Float8Array,
            Scalar::BoolArray(_) => FieldKind::BoolArray,
            Scalar::TextArray(_) => FieldKind::TextArray,
        }
    }

    /// The zero value of a kind.
    pub(crate) fn zero(kind: FieldKind) -> Scalar {
        match kind {
            FieldKind::Int(IntWidth::W16) => Scalar::Int2(0),
            FieldKind::Int(IntWidth::W32) => Scalar::Int4(0),
            FieldKind::Int(IntWidth::W64) => Scalar::Int8(0),
            FieldKind::Float(FloatWidth::W32) => Scalar::Float4(0.0),
            FieldKind::Float(FloatWidth::W64) => Scalar::Float8(0.0),
            FieldKind::Bool => Scalar::Bool(false),
            FieldKind::Text => Scalar::Text(String::new()),
            FieldKind::Timestamp => Scalar::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
            FieldKind::Point => Scalar::Point(Point::new(0.0, 0.0)),
            FieldKind::Json => Scalar::Json(Json::Null),
            FieldKind::Int8Array => Scalar::Int8Array(Vec::new()),
            FieldKind::Float8Array => Scalar::Float8Array(Vec::new()),
            FieldKind::BoolArray => Scalar::BoolArray(Vec::new()),
            FieldKind::TextArray => Scalar::TextArray(Vec::new()),
        }
    }

    /// Encode into a JSON value.
    pub fn to_json(&self) -> Json {
        match self {
            Scalar::Int2(v) => json!(v),
            Scalar::Int4(v) => json!(v),
            Scalar::Int8(v) => json!(v),
            Scalar::Float4(v) => float_json(f64::from(*v)),
            Scalar::Float8(v) => float_json(*v),
            Scalar::Bool(v) => json!(v),
            Scalar::Text(v) => json!(v),
            Scalar::Timestamp(v) => Json::String(v.to_rfc3339()),
            Scalar::Point(p) => json!({ "x": p.x(), "y": p.y() }),
            Scalar::Json(v) => v.clone(),
            Scalar::Int8Array(v) => json!(v),
            Scalar::Float8Array(v) => json!(v),
            Scalar::BoolArray(v) => json!(v),
            Scalar::TextArray(v) => json!(v),
        }
    }

    fn from_json(def: &FieldDef, value: &Json) -> CraftResult<Scalar> {
        let mismatch = |expected: &str| {
            CraftError::decode(def.name(), format!("expected {expected}, got {value}"))
        };
        Ok(match def.kind() {
            FieldKind::Int(width) => {
                let n = value.as_i64().ok_or_else(|| mismatch("an integer"))?;
                match width {
                    IntWidth::W16 => Scalar::Int2(
                        i16::try_from(n)
                            .map_err(|_| CraftError::decode(def.name(), "integer out of i16 range"))?,
                    ),
                    IntWidth::W32 => Scalar::Int4(
                        i32::try_from(n)
                            .map_err(|_| CraftError::decode(def.name(), "integer out of i32 range"))?,
                    ),
                    IntWidth::W64 => Scalar::Int8(n),
                }
            }
            FieldKind::Float(width) => {
                let n = value.as_f64().ok_or_else(|| mismatch("a number"))?;
                match width {
                    FloatWidth::W32 => Scalar::Float4(n as f32),
                    FloatWidth::W64 => Scalar::Float8(n),
                }
            }
            FieldKind::Bool => Scalar::Bool(value.as_bool().ok_or_else(|| mismatch("a boolean"))?),
            FieldKind::Text => {
                Scalar::Text(value.as_str().ok_or_else(|| mismatch("a string"))?.to_string())
            }
            FieldKind::Timestamp => {
                let s = value.as_str().ok_or_else(|| mismatch("an RFC 3339 string"))?;
                let ts = DateTime::parse_from_rfc3339(s)
                    .map_err(|e| CraftError::decode(def.name(), e.to_string()))?;
                Scalar::Timestamp(ts.with_timezone(&Utc))
            }
            FieldKind::Point => {
                let obj = value.as_object().ok_or_else(|| mismatch("a {x, y} object"))?;
                let x = obj.get("x").and_then(Json::as_f64);
                let y = obj.get("y").and_then(Json::as_f64);
                match (x, y) {
                    (Some(x), Some(y)) => Scalar::Point(Point::new(x, y)),
                    _ => return Err(mismatch("a {x, y} object")),
                }
            }
            FieldKind::Json => Scalar::Json(value.clone()),
            FieldKind::Int8Array => {
                Scalar::Int8Array(json_array(value, Json::as_i64).ok_or_else(|| mismatch("an integer array"))?)
            }
            FieldKind::Float8Array => {
                Scalar::Float8Array(json_array(value, Json::as_f64).ok_or_else(|| mismatch("a number array"))?)
            }
            FieldKind::BoolArray => {
                Scalar::BoolArray(json_array(value, Json::as_bool).ok_or_else(|| mismatch("a boolean array"))?)
            }
            FieldKind::TextArray => Scalar::TextArray(
                json_array(value, |v| v.as_str().map(str::to_string))
                    .ok_or_else(|| mismatch("a string array"))?,
            ),
        })
    }
}

fn float_json(v: f64) -> Json {
    serde_json::Number::from_f64(v).map_or(Json::Null, Json::Number)
}

fn json_array<T>(value: &Json, elem: impl Fn(&Json) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(elem).collect()
}

/// One record member: a plain scalar or a nullable wrapper around one.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Plain(Scalar),
    Null(Nullable<Scalar>),
}

impl Cell {
    /// A present non-nullable value.
    pub fn plain(scalar: Scalar) -> Cell {
        Cell::Plain(scalar)
    }

    /// A present nullable value.
    pub fn nullable(scalar: Scalar) -> Cell {
        Cell::Null(Nullable::new(scalar))
    }

    /// The NULL cell of a kind.
    pub fn null_of(kind: FieldKind) -> Cell {
        Cell::Null(Nullable {
            value: Scalar::zero(kind),
            valid: false,
        })
    }

    /// The zero cell for a field (NULL for nullable fields).
    pub(crate) fn zero(def: &FieldDef) -> Cell {
        if def.nullable() {
            Cell::null_of(def.kind())
        } else {
            Cell::Plain(Scalar::zero(def.kind()))
        }
    }

    /// The field kind this cell belongs to.
    pub fn kind(&self) -> FieldKind {
        match self {
            Cell::Plain(s) => s.kind(),
            Cell::Null(n) => n.value.kind(),
        }
    }

    /// Check if this cell holds SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null(n) if !n.valid)
    }

    /// Borrow the scalar payload if present.
    pub fn scalar(&self) -> Option<&Scalar> {
        match self {
            Cell::Plain(s) => Some(s),
            Cell::Null(n) => n.get(),
        }
    }

    /// Check shape agreement with a field descriptor.
    pub fn matches(&self, def: &FieldDef) -> bool {
        self.kind() == def.kind() && matches!(self, Cell::Null(_)) == def.nullable()
    }

    /// Encode into a JSON value; NULL cells encode as an explicit `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Cell::Plain(s) => s.to_json(),
            Cell::Null(n) if n.valid => n.value.to_json(),
            Cell::Null(_) => Json::Null,
        }
    }

    /// Decode a JSON value into the cell shape of a field.
    ///
    /// A JSON `null` is only representable for nullable fields.
    pub(crate) fn from_json(def: &FieldDef, value: &Json) -> CraftResult<Cell> {
        if value.is_null() {
            if def.nullable() {
                return Ok(Cell::null_of(def.kind()));
            }
            return Err(CraftError::decode(
                def.name(),
                "null is not valid for a non-nullable field",
            ));
        }
        let scalar = Scalar::from_json(def, value)?;
        Ok(if def.nullable() {
            Cell::nullable(scalar)
        } else {
            Cell::Plain(scalar)
        })
    }
}

impl ToSql for Scalar {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Scalar::Int2(v) => v.to_sql(ty, out),
            Scalar::Int4(v) => v.to_sql(ty, out),
            Scalar::Int8(v) => v.to_sql(ty, out),
            Scalar::Float4(v) => v.to_sql(ty, out),
            Scalar::Float8(v) => v.to_sql(ty, out),
            Scalar::Bool(v) => v.to_sql(ty, out),
            Scalar::Text(v) => v.to_sql(ty, out),
            Scalar::Timestamp(v) => v.to_sql(ty, out),
            Scalar::Point(v) => v.to_sql(ty, out),
            Scalar::Json(v) => v.to_sql(ty, out),
            Scalar::Int8Array(v) => v.to_sql(ty, out),
            Scalar::Float8Array(v) => v.to_sql(ty, out),
            Scalar::BoolArray(v) => v.to_sql(ty, out),
            Scalar::TextArray(v) => v.to_sql(ty, out),
        }
    }

    // Cells are dynamically typed; the per-variant delegate performs the
    // real check in `to_sql_checked`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Scalar::Int2(v) => v.to_sql_checked(ty, out),
            Scalar::Int4(v) => v.to_sql_checked(ty, out),
            Scalar::Int8(v) => v.to_sql_checked(ty, out),
            Scalar::Float4(v) => v.to_sql_checked(ty, out),
            Scalar::Float8(v) => v.to_sql_checked(ty, out),
            Scalar::Bool(v) => v.to_sql_checked(ty, out),
            Scalar::Text(v) => v.to_sql_checked(ty, out),
            Scalar::Timestamp(v) => v.to_sql_checked(ty, out),
            Scalar::Point(v) => v.to_sql_checked(ty, out),
            Scalar::Json(v) => v.to_sql_checked(ty, out),
            Scalar::Int8Array(v) => v.to_sql_checked(ty, out),
            Scalar::Float8Array(v) => v.to_sql_checked(ty, out),
            Scalar::BoolArray(v) => v.to_sql_checked(ty, out),
            Scalar::TextArray(v) => v.to_sql_checked(ty, out),
        }
    }
}

impl ToSql for Cell {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Plain(s) => s.to_sql(ty, out),
            Cell::Null(n) if n.valid => n.value.to_sql(ty, out),
            Cell::Null(_) => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Plain(s) => s.to_sql_checked(ty, out),
            Cell::Null(n) if n.valid => n.value.to_sql_checked(ty, out),
            Cell::Null(_) => Ok(IsNull::Yes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_field(nullable: bool) -> FieldDef {
        FieldDef::int("N", nullable, false, 64).unwrap()
    }

    #[test]
    fn zero_cells_follow_nullability() {
        assert_eq!(
            Cell::zero(&int_field(false)),
            Cell::Plain(Scalar::Int8(0))
        );
        assert!(Cell::zero(&int_field(true)).is_null());
    }

    #[test]
    fn json_round_trip_plain() {
        let def = int_field(false);
        let cell = Cell::from_json(&def, &json!(7)).unwrap();
        assert_eq!(cell, Cell::Plain(Scalar::Int8(7)));
        assert_eq!(cell.to_json(), json!(7));
    }

    #[test]
    fn json_null_only_for_nullable() {
        assert!(Cell::from_json(&int_field(false), &Json::Null).is_err());
        let cell = Cell::from_json(&int_field(true), &Json::Null).unwrap();
        assert!(cell.is_null());
        assert_eq!(cell.to_json(), Json::Null);
    }

    #[test]
    fn json_point_shape() {
        let def = FieldDef::point("P", false, false).unwrap();
        let cell = Cell::from_json(&def, &json!({"x": 1.5, "y": -2.0})).unwrap();
        assert_eq!(cell, Cell::Plain(Scalar::Point(Point::new(1.5, -2.0))));
        assert_eq!(cell.to_json(), json!({"x": 1.5, "y": -2.0}));
    }

    #[test]
    fn json_timestamp_round_trip() {
        let def = FieldDef::timestamp("T", false, false).unwrap();
        let cell = Cell::from_json(&def, &json!("2024-05-01T12:30:00+00:00")).unwrap();
        assert_eq!(cell.to_json(), json!("2024-05-01T12:30:00+00:00"));
    }

    #[test]
    fn empty_valid_array_round_trips_as_brackets() {
        let def = FieldDef::int_array("A", true, false).unwrap();
        let cell = Cell::from_json(&def, &json!([])).unwrap();
        assert_eq!(cell, Cell::nullable(Scalar::Int8Array(vec![])));
        assert_eq!(cell.to_json(), json!([]));

        let null_cell = Cell::from_json(&def, &Json::Null).unwrap();
        assert_eq!(null_cell.to_json(), Json::Null);
        assert_ne!(cell, null_cell);
    }

    #[test]
    fn width_range_checks() {
        let def = FieldDef::int("S", false, false, 16).unwrap();
        assert!(Cell::from_json(&def, &json!(70000)).is_err());
        assert_eq!(
            Cell::from_json(&def, &json!(12)).unwrap(),
            Cell::Plain(Scalar::Int2(12))
        );
    }

    #[test]
    fn cell_shape_matching() {
        let def = int_field(true);
        assert!(Cell::null_of(def.kind()).matches(&def));
        assert!(!Cell::Plain(Scalar::Int8(1)).matches(&def));
        assert!(!Cell::Plain(Scalar::Int4(1)).matches(&int_field(false)));
    }
}
