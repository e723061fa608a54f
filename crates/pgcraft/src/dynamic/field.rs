//! Field descriptors for dynamic objects.
//!
//! A [`FieldDef`] describes one column of a runtime-synthesized record:
//! name, nullability, editability, and primitive kind. Descriptors are
//! validated at construction and immutable afterwards.

use crate::error::{CraftError, CraftResult};

/// Storage width of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W16,
    W32,
    W64,
}

/// Storage width of a float field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    W32,
    W64,
}

/// Primitive kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int(IntWidth),
    Float(FloatWidth),
    Text,
    Bool,
    Timestamp,
    Point,
    Json,
    Int8Array,
    Float8Array,
    BoolArray,
    TextArray,
}

/// One column of a dynamic record shape.
///
/// Nullable numeric fields are always widened to 64 bits: their payload is
/// a [`Nullable`](crate::nullable::Nullable) wrapper, not a raw primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    name: String,
    nullable: bool,
    editable: bool,
    kind: FieldKind,
}

impl FieldDef {
    fn checked(name: &str, nullable: bool, editable: bool, kind: FieldKind) -> CraftResult<Self> {
        if name.is_empty() {
            return Err(CraftError::schema("field name must not be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            nullable,
            editable,
            kind,
        })
    }

    /// Integer field with the given bit width (16, 32, or 64).
    pub fn int(name: &str, nullable: bool, editable: bool, bits: u8) -> CraftResult<Self> {
        let width = match bits {
            16 => IntWidth::W16,
            32 => IntWidth::W32,
            64 => IntWidth::W64,
            other => {
                return Err(CraftError::schema(format!(
                    "integer width must be 16, 32, or 64 (got {other})"
                )));
            }
        };
        // Nullable payloads are wrapper types; they carry the widest form.
        let width = if nullable { IntWidth::W64 } else { width };
        Self::checked(name, nullable, editable, FieldKind::Int(width))
    }

    /// Float field with the given bit width (32 or 64).
    pub fn float(name: &str, nullable: bool, editable: bool, bits: u8) -> CraftResult<Self> {
        let width = match bits {
            32 => FloatWidth::W32,
            64 => FloatWidth::W64,
            other => {
                return Err(CraftError::schema(format!(
                    "float width must be 32 or 64 (got {other})"
                )));
            }
        };
        let width = if nullable { FloatWidth::W64 } else { width };
        Self::checked(name, nullable, editable, FieldKind::Float(width))
    }

    /// Text field.
    pub fn text(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::Text)
    }

    /// Boolean field.
    pub fn boolean(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::Bool)
    }

    /// Timestamp-with-timezone field.
    pub fn timestamp(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::Timestamp)
    }

    /// 2D point field.
    pub fn point(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::Point)
    }

    /// JSON object field.
    pub fn json(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::Json)
    }

    /// Array of 64-bit integers.
    pub fn int_array(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::Int8Array)
    }

    /// Array of 64-bit floats.
    pub fn float_array(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::Float8Array)
    }

    /// Array of booleans.
    pub fn bool_array(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::BoolArray)
    }

    /// Array of text values.
    pub fn text_array(name: &str, nullable: bool, editable: bool) -> CraftResult<Self> {
        Self::checked(name, nullable, editable, FieldKind::TextArray)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_field_widths() {
        assert_eq!(
            FieldDef::int("a", false, false, 16).unwrap().kind(),
            FieldKind::Int(IntWidth::W16)
        );
        assert_eq!(
            FieldDef::int("a", false, false, 32).unwrap().kind(),
            FieldKind::Int(IntWidth::W32)
        );
        assert_eq!(
            FieldDef::int("a", false, false, 64).unwrap().kind(),
            FieldKind::Int(IntWidth::W64)
        );
    }

    #[test]
    fn nullable_numerics_widen_to_64() {
        assert_eq!(
            FieldDef::int("a", true, false, 16).unwrap().kind(),
            FieldKind::Int(IntWidth::W64)
        );
        assert_eq!(
            FieldDef::float("a", true, false, 32).unwrap().kind(),
            FieldKind::Float(FloatWidth::W64)
        );
    }

    #[test]
    fn rejects_bad_width() {
        assert!(FieldDef::int("a", false, false, 8).is_err());
        assert!(FieldDef::int("a", false, false, 128).is_err());
        assert!(FieldDef::float("a", false, false, 16).is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(FieldDef::text("", false, false).is_err());
    }
}
