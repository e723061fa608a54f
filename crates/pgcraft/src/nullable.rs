//! Nullable value wrappers.
//!
//! [`Nullable<T>`] pairs a value with a validity flag and models SQL NULL
//! end to end: an invalid wrapper persists as NULL through [`ToSql`],
//! scans back from NULL through [`FromSql`], and serializes to an explicit
//! JSON `null`. Validity is always reconstructed from the null literal (or
//! the driver's absence signal), never from a zero value, so an
//! empty-but-valid array stays distinguishable from a NULL array.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

/// Zero payload carried by an invalid wrapper.
///
/// This crate's own stand-in for `Default`, which several payload types
/// (`DateTime<Utc>`, `Point<f64>`) do not implement.
pub trait NullDefault {
    fn null_default() -> Self;
}

impl NullDefault for i16 {
    fn null_default() -> Self {
        0
    }
}

impl NullDefault for i32 {
    fn null_default() -> Self {
        0
    }
}

impl NullDefault for i64 {
    fn null_default() -> Self {
        0
    }
}

impl NullDefault for f32 {
    fn null_default() -> Self {
        0.0
    }
}

impl NullDefault for f64 {
    fn null_default() -> Self {
        0.0
    }
}

impl NullDefault for bool {
    fn null_default() -> Self {
        false
    }
}

impl NullDefault for String {
    fn null_default() -> Self {
        String::new()
    }
}

impl NullDefault for DateTime<Utc> {
    fn null_default() -> Self {
        DateTime::<Utc>::UNIX_EPOCH
    }
}

impl NullDefault for Point<f64> {
    fn null_default() -> Self {
        Point::new(0.0, 0.0)
    }
}

impl NullDefault for serde_json::Value {
    fn null_default() -> Self {
        serde_json::Value::Null
    }
}

impl<T> NullDefault for Vec<T> {
    fn null_default() -> Self {
        Vec::new()
    }
}

/// A value paired with a validity flag.
///
/// `valid == false` means SQL NULL; the payload then holds the kind's zero
/// value and must not be interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nullable<T> {
    pub value: T,
    pub valid: bool,
}

impl<T> Nullable<T> {
    /// Wrap a present value.
    pub fn new(value: T) -> Self {
        Self { value, valid: true }
    }

    /// The NULL wrapper for this payload type.
    pub fn null() -> Self
    where
        T: NullDefault,
    {
        Self {
            value: T::null_default(),
            valid: false,
        }
    }

    /// Borrow the payload if valid.
    pub fn get(&self) -> Option<&T> {
        if self.valid { Some(&self.value) } else { None }
    }

    /// Consume into an `Option`, `None` when invalid.
    pub fn into_option(self) -> Option<T> {
        if self.valid { Some(self.value) } else { None }
    }

    /// Check if this wrapper holds SQL NULL.
    pub fn is_null(&self) -> bool {
        !self.valid
    }
}

impl<T: NullDefault> Default for Nullable<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: NullDefault> From<Option<T>> for Nullable<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => Self::new(value),
            None => Self::null(),
        }
    }
}

impl<T> From<Nullable<T>> for Option<T> {
    fn from(n: Nullable<T>) -> Self {
        n.into_option()
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.valid {
            serializer.serialize_some(&self.value)
        } else {
            serializer.serialize_none()
        }
    }
}

impl<'de, T> Deserialize<'de> for Nullable<T>
where
    T: Deserialize<'de> + NullDefault,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Nullable::new(value),
            None => Nullable::null(),
        })
    }
}

impl<T> ToSql for Nullable<T>
where
    T: ToSql,
{
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if self.valid {
            self.value.to_sql(ty, out)
        } else {
            Ok(IsNull::Yes)
        }
    }

    fn accepts(ty: &Type) -> bool {
        T::accepts(ty)
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a, T> FromSql<'a> for Nullable<T>
where
    T: FromSql<'a> + NullDefault,
{
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Nullable::new(T::from_sql(ty, raw)?))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Nullable::null())
    }

    fn accepts(ty: &Type) -> bool {
        T::accepts(ty)
    }
}
