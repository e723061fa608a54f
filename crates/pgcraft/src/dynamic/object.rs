//! Dynamic objects: runtime-synthesized record shapes and their handles.
//!
//! An [`Object`] is an ordered, validated set of field descriptors. It
//! realizes three runtime shapes without compile-time knowledge of the
//! layout: a record (one cell per field), a growable slice of records, and
//! a patch (editable fields only, each optionally set). All three are
//! reached through the opaque [`Handle`] type; accessors fail with
//! descriptive errors on misuse rather than panicking.
//!
//! Record storage is a position-indexed cell arena with a name→index map
//! built once per object. An element handle obtained from a slice is an
//! index into the slice's own arena, so mutation through either handle is
//! visible through the other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use crate::dynamic::field::FieldDef;
use crate::dynamic::value::Cell;
use crate::error::{CraftError, CraftResult};

#[derive(Debug)]
struct ObjectInner {
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
    /// Positions of editable fields, in declaration order.
    editable: Vec<usize>,
    /// Field name → slot in the patch shape.
    patch_index: HashMap<String, usize>,
}

/// An ordered set of field descriptors plus its synthesized runtime shapes.
///
/// Objects are immutable after construction and cheap to clone; instance
/// and slice creation is stateless beyond the shared schema.
#[derive(Debug, Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Build an object from field descriptors.
    ///
    /// Duplicate names fail here, not at use.
    pub fn new(fields: impl IntoIterator<Item = FieldDef>) -> CraftResult<Object> {
        let fields: Vec<FieldDef> = fields.into_iter().collect();
        let mut index = HashMap::with_capacity(fields.len());
        let mut editable = Vec::new();
        let mut patch_index = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name().to_string(), i).is_some() {
                return Err(CraftError::schema(format!(
                    "duplicate field name '{}'",
                    field.name()
                )));
            }
            if field.editable() {
                patch_index.insert(field.name().to_string(), editable.len());
                editable.push(i);
            }
        }
        Ok(Object {
            inner: Arc::new(ObjectInner {
                fields,
                index,
                editable,
                patch_index,
            }),
        })
    }

    /// The field descriptors, in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.inner.fields
    }

    /// Look up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.inner.index.get(name).map(|&i| &self.inner.fields[i])
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.inner.fields.len()
    }

    /// The editable field descriptors, in declaration order.
    pub fn editable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.inner.editable.iter().map(|&i| &self.inner.fields[i])
    }

    fn field_index(&self, name: &str) -> CraftResult<usize> {
        self.inner
            .index
            .get(name)
            .copied()
            .ok_or_else(|| CraftError::unknown_field(name))
    }

    fn patch_slot(&self, name: &str) -> CraftResult<usize> {
        // Unknown and non-editable names both fall outside the patch shape.
        self.inner
            .patch_index
            .get(name)
            .copied()
            .ok_or_else(|| CraftError::unknown_field(name))
    }

    pub(crate) fn zero_row(&self) -> Vec<Cell> {
        self.inner.fields.iter().map(Cell::zero).collect()
    }

    pub(crate) fn empty_patch_row(&self) -> Vec<Option<Cell>> {
        vec![None; self.inner.editable.len()]
    }

    /// A zero-valued record handle.
    pub fn create_instance(&self) -> Handle {
        Handle {
            object: self.clone(),
            repr: Repr::Instance(Rc::new(RefCell::new(self.zero_row()))),
        }
    }

    /// An empty, growable slice-of-records handle.
    pub fn create_slice(&self) -> Handle {
        Handle {
            object: self.clone(),
            repr: Repr::Slice(Rc::new(RefCell::new(Vec::new()))),
        }
    }

    /// A patch handle: editable fields only, all initially absent.
    pub fn create_patch(&self) -> Handle {
        Handle {
            object: self.clone(),
            repr: Repr::Patch(Rc::new(RefCell::new(self.empty_patch_row()))),
        }
    }

    /// An empty, growable slice-of-patches handle.
    pub fn create_patch_slice(&self) -> Handle {
        Handle {
            object: self.clone(),
            repr: Repr::PatchSlice(Rc::new(RefCell::new(Vec::new()))),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Repr {
    Instance(Rc<RefCell<Vec<Cell>>>),
    Slice(Rc<RefCell<Vec<Vec<Cell>>>>),
    Element {
        rows: Rc<RefCell<Vec<Vec<Cell>>>>,
        row: usize,
    },
    Patch(Rc<RefCell<Vec<Option<Cell>>>>),
    PatchSlice(Rc<RefCell<Vec<Vec<Option<Cell>>>>>),
    PatchElement {
        rows: Rc<RefCell<Vec<Vec<Option<Cell>>>>>,
        row: usize,
    },
}

impl Repr {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Repr::Instance(_) => "record",
            Repr::Slice(_) => "slice",
            Repr::Element { .. } => "record",
            Repr::Patch(_) => "patch",
            Repr::PatchSlice(_) => "patch slice",
            Repr::PatchElement { .. } => "patch",
        }
    }
}

/// Result of a field access.
///
/// `Absent` only occurs for patch shapes: the member was never supplied.
/// An explicit null arrives as `Value` holding a NULL cell, so "not
/// supplied" and "set to null" stay distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Cell),
    Absent,
}

impl FieldValue {
    /// The cell, if the member was supplied.
    pub fn cell(self) -> Option<Cell> {
        match self {
            FieldValue::Value(cell) => Some(cell),
            FieldValue::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

/// An opaque handle to a record, slice, or patch instance.
///
/// Handles are shareable views over single-owner storage; they are not safe
/// for concurrent use. Cloning a handle aliases the same storage.
#[derive(Debug, Clone)]
pub struct Handle {
    pub(crate) object: Object,
    pub(crate) repr: Repr,
}

impl Handle {
    /// The object this handle was created from.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Get a field by name.
    ///
    /// Fails on slice handles and unknown field names.
    pub fn field(&self, name: &str) -> CraftResult<FieldValue> {
        match &self.repr {
            Repr::Instance(cells) => {
                let i = self.object.field_index(name)?;
                Ok(FieldValue::Value(cells.borrow()[i].clone()))
            }
            Repr::Element { rows, row } => {
                let i = self.object.field_index(name)?;
                let rows = rows.borrow();
                let cells = rows
                    .get(*row)
                    .ok_or_else(|| CraftError::handle("element handle outlived its slice row"))?;
                Ok(FieldValue::Value(cells[i].clone()))
            }
            Repr::Patch(slots) => {
                let slot = self.object.patch_slot(name)?;
                Ok(match &slots.borrow()[slot] {
                    Some(cell) => FieldValue::Value(cell.clone()),
                    None => FieldValue::Absent,
                })
            }
            Repr::PatchElement { rows, row } => {
                let slot = self.object.patch_slot(name)?;
                let rows = rows.borrow();
                let slots = rows
                    .get(*row)
                    .ok_or_else(|| CraftError::handle("element handle outlived its slice row"))?;
                Ok(match &slots[slot] {
                    Some(cell) => FieldValue::Value(cell.clone()),
                    None => FieldValue::Absent,
                })
            }
            Repr::Slice(_) | Repr::PatchSlice(_) => Err(CraftError::handle(format!(
                "field access on a {} handle; use elem() to reach a record",
                self.repr.describe()
            ))),
        }
    }

    /// Set a field by name, checking the cell against the field's shape.
    ///
    /// On patch handles only editable fields can be set.
    pub fn set_field(&self, name: &str, cell: Cell) -> CraftResult<()> {
        match &self.repr {
            Repr::Instance(cells) => {
                let i = self.checked_index(name, &cell)?;
                cells.borrow_mut()[i] = cell;
                Ok(())
            }
            Repr::Element { rows, row } => {
                let i = self.checked_index(name, &cell)?;
                let mut rows = rows.borrow_mut();
                let cells = rows
                    .get_mut(*row)
                    .ok_or_else(|| CraftError::handle("element handle outlived its slice row"))?;
                cells[i] = cell;
                Ok(())
            }
            Repr::Patch(slots) => {
                let slot = self.checked_patch_slot(name, &cell)?;
                slots.borrow_mut()[slot] = Some(cell);
                Ok(())
            }
            Repr::PatchElement { rows, row } => {
                let slot = self.checked_patch_slot(name, &cell)?;
                let mut rows = rows.borrow_mut();
                let slots = rows
                    .get_mut(*row)
                    .ok_or_else(|| CraftError::handle("element handle outlived its slice row"))?;
                slots[slot] = Some(cell);
                Ok(())
            }
            Repr::Slice(_) | Repr::PatchSlice(_) => Err(CraftError::handle(format!(
                "field mutation on a {} handle; use elem() to reach a record",
                self.repr.describe()
            ))),
        }
    }

    fn checked_index(&self, name: &str, cell: &Cell) -> CraftResult<usize> {
        let i = self.object.field_index(name)?;
        let def = &self.object.fields()[i];
        if !cell.matches(def) {
            return Err(CraftError::handle(format!(
                "field '{}' expects {:?} (nullable: {}), got a {:?} cell",
                name,
                def.kind(),
                def.nullable(),
                cell.kind()
            )));
        }
        Ok(i)
    }

    fn checked_patch_slot(&self, name: &str, cell: &Cell) -> CraftResult<usize> {
        let slot = self.object.patch_slot(name)?;
        let def = self
            .object
            .field(name)
            .ok_or_else(|| CraftError::unknown_field(name))?;
        if !cell.matches(def) {
            return Err(CraftError::handle(format!(
                "field '{}' expects {:?} (nullable: {}), got a {:?} cell",
                name,
                def.kind(),
                def.nullable(),
                cell.kind()
            )));
        }
        Ok(slot)
    }

    /// Get an element of a slice handle.
    ///
    /// The returned record handle aliases the slice's storage: mutation is
    /// visible through both.
    pub fn elem(&self, index: usize) -> CraftResult<Handle> {
        match &self.repr {
            Repr::Slice(rows) => {
                let len = rows.borrow().len();
                if index >= len {
                    return Err(CraftError::OutOfRange { index, len });
                }
                Ok(Handle {
                    object: self.object.clone(),
                    repr: Repr::Element {
                        rows: rows.clone(),
                        row: index,
                    },
                })
            }
            Repr::PatchSlice(rows) => {
                let len = rows.borrow().len();
                if index >= len {
                    return Err(CraftError::OutOfRange { index, len });
                }
                Ok(Handle {
                    object: self.object.clone(),
                    repr: Repr::PatchElement {
                        rows: rows.clone(),
                        row: index,
                    },
                })
            }
            other => Err(CraftError::handle(format!(
                "elem() on a {} handle; only slices have elements",
                other.describe()
            ))),
        }
    }

    /// Number of elements in a slice handle.
    pub fn len(&self) -> CraftResult<usize> {
        match &self.repr {
            Repr::Slice(rows) => Ok(rows.borrow().len()),
            Repr::PatchSlice(rows) => Ok(rows.borrow().len()),
            other => Err(CraftError::handle(format!(
                "len() on a {} handle; only slices have a length",
                other.describe()
            ))),
        }
    }

    /// Append records to a slice handle's arena.
    pub(crate) fn push_rows(&self, new_rows: Vec<Vec<Cell>>) -> CraftResult<()> {
        match &self.repr {
            Repr::Slice(rows) => {
                rows.borrow_mut().extend(new_rows);
                Ok(())
            }
            other => Err(CraftError::handle(format!(
                "row append on a {} handle; only slices grow",
                other.describe()
            ))),
        }
    }

    /// Append patches to a patch-slice handle's arena.
    pub(crate) fn push_patch_rows(&self, new_rows: Vec<Vec<Option<Cell>>>) -> CraftResult<()> {
        match &self.repr {
            Repr::PatchSlice(rows) => {
                rows.borrow_mut().extend(new_rows);
                Ok(())
            }
            other => Err(CraftError::handle(format!(
                "row append on a {} handle; only slices grow",
                other.describe()
            ))),
        }
    }

    /// Encode this handle into JSON.
    ///
    /// Records become objects (NULL cells as `null`), slices become arrays,
    /// patches become objects holding only their set members.
    pub fn to_json(&self) -> Json {
        match &self.repr {
            Repr::Instance(cells) => record_json(&self.object, &cells.borrow()),
            Repr::Element { rows, row } => rows
                .borrow()
                .get(*row)
                .map_or(Json::Null, |cells| record_json(&self.object, cells)),
            Repr::Slice(rows) => Json::Array(
                rows.borrow()
                    .iter()
                    .map(|cells| record_json(&self.object, cells))
                    .collect(),
            ),
            Repr::Patch(slots) => patch_json(&self.object, &slots.borrow()),
            Repr::PatchElement { rows, row } => rows
                .borrow()
                .get(*row)
                .map_or(Json::Null, |slots| patch_json(&self.object, slots)),
            Repr::PatchSlice(rows) => Json::Array(
                rows.borrow()
                    .iter()
                    .map(|slots| patch_json(&self.object, slots))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Handle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

fn record_json(object: &Object, cells: &[Cell]) -> Json {
    let mut map = serde_json::Map::with_capacity(cells.len());
    for (def, cell) in object.fields().iter().zip(cells) {
        map.insert(def.name().to_string(), cell.to_json());
    }
    Json::Object(map)
}

fn patch_json(object: &Object, slots: &[Option<Cell>]) -> Json {
    let mut map = serde_json::Map::new();
    for (def, slot) in object.editable_fields().zip(slots) {
        if let Some(cell) = slot {
            map.insert(def.name().to_string(), cell.to_json());
        }
    }
    Json::Object(map)
}
