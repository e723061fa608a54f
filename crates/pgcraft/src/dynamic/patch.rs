//! JSON decoding into record and patch handles.
//!
//! Patch semantics follow the partial-update contract: a key omitted from
//! the payload leaves the member absent ("no change"); an explicit `null`
//! on a nullable member sets a present-but-invalid wrapper, so the
//! null-vs-absent distinction survives for downstream persistence; an
//! explicit `null` on a non-nullable member is also "no change".

use serde_json::Value as Json;

use crate::dynamic::object::{Handle, Object, Repr};
use crate::dynamic::value::Cell;
use crate::error::{CraftError, CraftResult};

impl Handle {
    /// Decode a JSON payload into this handle.
    ///
    /// Record handles take an object payload and set every present field
    /// (a `null` for a non-nullable field is an error). Patch handles take
    /// an object payload under patch semantics. Slice handles take an
    /// array payload and append one record/patch per element.
    pub fn apply_json(&self, payload: &Json) -> CraftResult<()> {
        match &self.repr {
            Repr::Instance(cells) => {
                let row = decode_record(&self.object, payload, &cells.borrow())?;
                *cells.borrow_mut() = row;
                Ok(())
            }
            Repr::Element { rows, row } => {
                let decoded = {
                    let rows = rows.borrow();
                    let cells = rows
                        .get(*row)
                        .ok_or_else(|| CraftError::handle("element handle outlived its slice row"))?;
                    decode_record(&self.object, payload, cells)?
                };
                rows.borrow_mut()[*row] = decoded;
                Ok(())
            }
            Repr::Patch(slots) => {
                let decoded = decode_patch(&self.object, payload, &slots.borrow())?;
                *slots.borrow_mut() = decoded;
                Ok(())
            }
            Repr::PatchElement { rows, row } => {
                let decoded = {
                    let rows = rows.borrow();
                    let slots = rows
                        .get(*row)
                        .ok_or_else(|| CraftError::handle("element handle outlived its slice row"))?;
                    decode_patch(&self.object, payload, slots)?
                };
                rows.borrow_mut()[*row] = decoded;
                Ok(())
            }
            Repr::Slice(_) => {
                let items = as_array(payload)?;
                let mut new_rows = Vec::with_capacity(items.len());
                for item in items {
                    new_rows.push(decode_record(&self.object, item, &self.object.zero_row())?);
                }
                self.push_rows(new_rows)
            }
            Repr::PatchSlice(_) => {
                let items = as_array(payload)?;
                let mut new_rows = Vec::with_capacity(items.len());
                for item in items {
                    new_rows.push(decode_patch(
                        &self.object,
                        item,
                        &self.object.empty_patch_row(),
                    )?);
                }
                self.push_patch_rows(new_rows)
            }
        }
    }
}

fn as_object(payload: &Json) -> CraftResult<&serde_json::Map<String, Json>> {
    payload
        .as_object()
        .ok_or_else(|| CraftError::handle(format!("expected a JSON object payload, got {payload}")))
}

fn as_array(payload: &Json) -> CraftResult<&Vec<Json>> {
    payload
        .as_array()
        .ok_or_else(|| CraftError::handle(format!("expected a JSON array payload, got {payload}")))
}

/// Decode into a full record row, starting from the current cells.
/// Present keys overwrite; omitted fields keep their current value.
fn decode_record(object: &Object, payload: &Json, current: &[Cell]) -> CraftResult<Vec<Cell>> {
    let map = as_object(payload)?;
    let mut row = current.to_vec();
    for (i, def) in object.fields().iter().enumerate() {
        if let Some(value) = map.get(def.name()) {
            row[i] = Cell::from_json(def, value)?;
        }
    }
    Ok(row)
}

/// Decode into a patch row under partial-update semantics.
fn decode_patch(
    object: &Object,
    payload: &Json,
    current: &[Option<Cell>],
) -> CraftResult<Vec<Option<Cell>>> {
    let map = as_object(payload)?;
    let mut slots = current.to_vec();
    for (slot, def) in object.editable_fields().enumerate() {
        match map.get(def.name()) {
            None => {}
            Some(Json::Null) if !def.nullable() => {
                // Null cannot be stored in a non-nullable field; treat it
                // as "no change", matching the omitted-key case.
            }
            Some(value) => {
                slots[slot] = Some(Cell::from_json(def, value)?);
            }
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::field::FieldDef;
    use crate::dynamic::object::FieldValue;
    use crate::dynamic::value::Scalar;
    use serde_json::json;

    fn sample_object() -> Object {
        Object::new([
            FieldDef::int("I", true, true, 32).unwrap(),
            FieldDef::float("F", true, false, 32).unwrap(),
            FieldDef::boolean("B", true, true).unwrap(),
            FieldDef::text("S", false, true).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn instance_decode_sets_present_fields() {
        let obj = sample_object();
        let inst = obj.create_instance();
        inst.apply_json(&json!({"I": 32, "B": false, "S": "not null"}))
            .unwrap();

        assert_eq!(
            inst.field("I").unwrap(),
            FieldValue::Value(Cell::nullable(Scalar::Int8(32)))
        );
        assert_eq!(
            inst.field("S").unwrap(),
            FieldValue::Value(Cell::Plain(Scalar::Text("not null".into())))
        );
        // F was omitted and keeps its zero (NULL) cell.
        assert!(inst.field("F").unwrap().cell().unwrap().is_null());
    }

    #[test]
    fn instance_decode_rejects_null_for_non_nullable() {
        let obj = sample_object();
        let inst = obj.create_instance();
        let err = inst.apply_json(&json!({"S": null})).unwrap_err();
        assert!(matches!(err, CraftError::Decode { .. }));
    }

    #[test]
    fn patch_omitted_key_stays_absent() {
        let obj = sample_object();
        let patch = obj.create_patch();
        patch.apply_json(&json!({"I": 5})).unwrap();

        assert_eq!(
            patch.field("I").unwrap(),
            FieldValue::Value(Cell::nullable(Scalar::Int8(5)))
        );
        assert!(patch.field("B").unwrap().is_absent());
        assert!(patch.field("S").unwrap().is_absent());
    }

    #[test]
    fn patch_null_on_nullable_is_present_invalid() {
        let obj = sample_object();
        let patch = obj.create_patch();
        patch.apply_json(&json!({"I": null})).unwrap();

        let value = patch.field("I").unwrap();
        assert!(!value.is_absent());
        assert!(value.cell().unwrap().is_null());
    }

    #[test]
    fn patch_null_on_non_nullable_is_no_change() {
        let obj = sample_object();
        let patch = obj.create_patch();
        patch.apply_json(&json!({"S": null})).unwrap();
        assert!(patch.field("S").unwrap().is_absent());
    }

    #[test]
    fn patch_ignores_non_editable_keys() {
        let obj = sample_object();
        let patch = obj.create_patch();
        // F is not editable; its key is simply not part of the patch shape.
        patch.apply_json(&json!({"F": 1.5, "I": 2})).unwrap();
        assert!(patch.field("F").unwrap_err().is_unknown_field());
        assert!(!patch.field("I").unwrap().is_absent());
    }

    #[test]
    fn patch_json_shows_only_set_members() {
        let obj = sample_object();
        let patch = obj.create_patch();
        patch.apply_json(&json!({"I": null, "S": "x"})).unwrap();
        assert_eq!(patch.to_json(), json!({"I": null, "S": "x"}));
    }

    #[test]
    fn slice_decode_appends_records() {
        let obj = sample_object();
        let slice = obj.create_slice();
        slice
            .apply_json(&json!([{"S": "a"}, {"S": "b", "I": 1}]))
            .unwrap();

        assert_eq!(slice.len().unwrap(), 2);
        assert_eq!(
            slice.elem(1).unwrap().field("S").unwrap(),
            FieldValue::Value(Cell::Plain(Scalar::Text("b".into())))
        );
    }

    #[test]
    fn patch_slice_decode_appends_patches() {
        let obj = sample_object();
        let patches = obj.create_patch_slice();
        patches
            .apply_json(&json!([{"I": 1}, {"B": null}]))
            .unwrap();

        assert_eq!(patches.len().unwrap(), 2);
        let second = patches.elem(1).unwrap();
        assert!(second.field("I").unwrap().is_absent());
        assert!(second.field("B").unwrap().cell().unwrap().is_null());
    }
}
