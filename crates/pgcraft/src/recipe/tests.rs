//! Integration tests for the recipe module.

use crate::dynamic::{FieldDef, Object};
use crate::error::CraftError;
use crate::recipe::{Expr, OnConflict, OrderBy, Param, Source, prepare_parameters, sql};
use serde_json::json;
use tokio_postgres::types::{ToSql, Type};

/// Encode a resolved param through the driver codec to inspect its value.
fn encode(param: &(dyn ToSql + Sync), ty: &Type) -> Vec<u8> {
    let mut buf = bytes::BytesMut::new();
    param.to_sql_checked(ty, &mut buf).unwrap();
    buf.to_vec()
}

#[test]
fn select_basic() {
    let q = sql().read("a").read("b").select(["t"]).unwrap();
    assert_eq!(q, "SELECT a,b FROM t");
}

#[test]
fn select_without_tables_omits_from() {
    let q = sql().read("1").select(Vec::<Expr>::new()).unwrap();
    assert_eq!(q, "SELECT 1");
}

#[test]
fn select_with_multiple_tables() {
    let q = sql().read_all(["a", "b"]).select(["t", "u"]).unwrap();
    assert_eq!(q, "SELECT a,b FROM t,u");
}

#[test]
fn string_columns_become_raw_fragments() {
    // Strings pass the expression boundary through an explicit conversion
    // into raw fragments; nothing is silently dropped.
    let q = sql().read("count(*)").select(["t"]).unwrap();
    assert_eq!(q, "SELECT count(*) FROM t");
}

#[test]
fn where_conditions_and_together() {
    let q = sql()
        .read("*")
        .and_where(Expr::column("a").eq(Expr::placeholder()))
        .and_where(Expr::column("b").gt(Expr::placeholder()))
        .select(["t"])
        .unwrap();
    assert_eq!(q, "SELECT * FROM t WHERE ((a=$1) AND (b=$2))");
}

#[test]
fn tagged_placeholder_binds_once() {
    let q = sql()
        .read("*")
        .and_where(Expr::column("lo").le(Expr::tagged("pivot")))
        .and_where(Expr::column("hi").ge(Expr::tagged("pivot")))
        .select(["t"])
        .unwrap();
    assert_eq!(q, "SELECT * FROM t WHERE ((lo<=$1) AND (hi>=$1))");
}

#[test]
fn insert_column_and_value_lists_align() {
    let q = sql()
        .write(Expr::column("a"), Expr::placeholder())
        .write(Expr::column("b"), Expr::placeholder())
        .insert("t")
        .unwrap();
    assert_eq!(q, "INSERT INTO t (a,b) VALUES ($1,$2)");
}

#[test]
fn insert_without_writes_has_no_value_lists() {
    let q = sql().insert("t").unwrap();
    assert_eq!(q, "INSERT INTO t");
}

#[test]
fn insert_with_returning() {
    let q = sql()
        .write(Expr::column("name"), Expr::placeholder())
        .read("id")
        .insert("t")
        .unwrap();
    assert_eq!(q, "INSERT INTO t (name) VALUES ($1) RETURNING id");
}

#[test]
fn insert_on_conflict_do_update() {
    let q = sql()
        .write(Expr::column("id"), Expr::placeholder())
        .write(Expr::column("n"), Expr::placeholder())
        .add_clause(OnConflict::new(["id"]).write(Expr::column("n"), Expr::raw("EXCLUDED.n")))
        .insert("t")
        .unwrap();
    assert_eq!(
        q,
        "INSERT INTO t (id,n) VALUES ($1,$2) ON CONFLICT (id) DO UPDATE SET n=EXCLUDED.n"
    );
}

#[test]
fn update_with_set_where_returning() {
    let q = sql()
        .write(Expr::column("status"), Expr::placeholder())
        .and_where(Expr::column("id").eq(Expr::placeholder()))
        .read("id")
        .update("t")
        .unwrap();
    assert_eq!(
        q,
        "UPDATE t SET status=$1 WHERE ((id=$2)) RETURNING id"
    );
}

#[test]
fn delete_with_where() {
    let q = sql()
        .and_where(Expr::column("id").eq(Expr::placeholder()))
        .delete("t")
        .unwrap();
    assert_eq!(q, "DELETE FROM t WHERE ((id=$1))");
}

#[test]
fn clauses_render_in_added_order() {
    let q = sql()
        .read_all(["kind", "count(*)"])
        .add_clause(crate::recipe::Clause::group_by(["kind"]))
        .add_clause(crate::recipe::Clause::having([Expr::raw("count(*)").gt(1i64)]))
        .add_clause(OrderBy::new().asc(["kind"]))
        .select(["t"])
        .unwrap();
    assert_eq!(
        q,
        "SELECT kind,count(*) FROM t GROUP BY kind HAVING ((count(*)>1)) ORDER BY kind ASC"
    );
}

#[test]
fn read_list_rejects_misplaced_nodes() {
    let err = sql()
        .read(Expr::column("a").assign(Expr::placeholder()))
        .select(["t"])
        .unwrap_err();
    assert!(matches!(err, CraftError::Render(_)));

    let err = sql().read(Expr::relation("t")).select(["t"]).unwrap_err();
    assert!(matches!(err, CraftError::Render(_)));
}

#[test]
fn empty_select_is_an_error() {
    assert!(matches!(
        sql().select(["t"]),
        Err(CraftError::Render(_))
    ));
}

#[test]
fn prepare_parameters_named_sources_in_order() {
    // ["Hello", "Two"] resolved against {Two: 4} then {Hello: "World"}.
    let obj = Object::new([
        FieldDef::int("Two", false, false, 64).unwrap(),
    ])
    .unwrap();
    let record = obj.create_instance();
    record.apply_json(&json!({"Two": 4})).unwrap();

    let params = prepare_parameters(
        &["Hello", "Two"],
        &[
            Source::record(record),
            Source::map([("Hello", Param::new("World"))]),
        ],
    )
    .unwrap();
    assert_eq!(params.len(), 2);
    let refs = params.as_refs();
    assert_eq!(encode(refs[0], &Type::TEXT), b"World".to_vec());
    assert_eq!(encode(refs[1], &Type::INT8), 4i64.to_be_bytes().to_vec());
}

#[test]
fn prepare_parameters_mixes_positional_and_named() {
    let params = prepare_parameters(
        &["Hello", "", "World"],
        &[
            Source::value("str"),
            Source::map([("Hello", Param::new(1i64)), ("World", Param::new(2i64))]),
        ],
    )
    .unwrap();
    assert_eq!(params.len(), 3);
    let refs = params.as_refs();
    assert_eq!(encode(refs[0], &Type::INT8), 1i64.to_be_bytes().to_vec());
    assert_eq!(encode(refs[1], &Type::TEXT), b"str".to_vec());
    assert_eq!(encode(refs[2], &Type::INT8), 2i64.to_be_bytes().to_vec());
}

#[test]
fn prepare_parameters_first_match_wins() {
    let params = prepare_parameters(
        &["N"],
        &[
            Source::map([("N", Param::new(1i64))]),
            Source::map([("N", Param::new(2i64))]),
        ],
    )
    .unwrap();
    assert_eq!(encode(params.as_refs()[0], &Type::INT8), 1i64.to_be_bytes().to_vec());
}

#[test]
fn prepare_parameters_fails_on_unresolved_name() {
    let err = prepare_parameters(&["Missing"], &[Source::map([("Other", Param::new(1i64))])])
        .unwrap_err();
    assert!(matches!(err, CraftError::Unresolved(_)));
}

#[test]
fn prepare_parameters_fails_on_missing_positional() {
    let err = prepare_parameters(&["", ""], &[Source::value(1i64)]).unwrap_err();
    assert!(matches!(err, CraftError::Unresolved(_)));
}

#[test]
fn prepare_parameters_absent_patch_member_does_not_resolve() {
    let obj = Object::new([FieldDef::int("N", true, true, 64).unwrap()]).unwrap();
    let patch = obj.create_patch();

    let err = prepare_parameters(&["N"], &[Source::record(patch.clone())]).unwrap_err();
    assert!(matches!(err, CraftError::Unresolved(_)));

    // An explicit null is a present value and does resolve.
    patch.apply_json(&json!({"N": null})).unwrap();
    let params = prepare_parameters(&["N"], &[Source::record(patch)]).unwrap();
    assert_eq!(params.len(), 1);
}
