//! SQL expression nodes and their rendering.
//!
//! [`Expr`] is a closed sum type: one variant per node kind, one render arm
//! per variant. Nodes are immutable values; the chaining methods consume
//! their receiver and return a new composite node, so subtrees can be
//! shared freely once built.
//!
//! Strings convert into raw-expression nodes via `From<&str>`, numbers and
//! booleans into literals. The conversion is explicit at the type level:
//! anything that is not convertible to an [`Expr`] is rejected by the
//! compiler instead of being silently dropped.

use crate::error::{CraftError, CraftResult};
use crate::recipe::context::{RenderContext, WriteMode};

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// Operator joining the members of a logical group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    fn sql(self) -> &'static str {
        match self {
            LogicalOp::And => " AND ",
            LogicalOp::Or => " OR ",
        }
    }
}

/// A schema name, optionally double-quoted.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRef {
    name: String,
    quoted: bool,
}

impl SchemaRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: false,
        }
    }

    /// Render the name double-quoted.
    pub fn quote(mut self) -> Self {
        self.quoted = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, out: &mut String) {
        push_ident(out, &self.name, self.quoted);
    }
}

/// A relation (table) name with an optional schema qualifier.
///
/// The qualifier only renders when the context's schema-required flag is
/// set; inside a FROM clause it is redundant.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRef {
    name: String,
    schema: Option<SchemaRef>,
    quoted: bool,
}

impl RelationRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            quoted: false,
        }
    }

    pub fn in_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Render the name double-quoted.
    pub fn quote(mut self) -> Self {
        self.quoted = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a column expression qualified by this relation.
    pub fn column(&self, name: impl Into<String>) -> Expr {
        Expr::Column {
            name: name.into(),
            relation: Some(self.clone()),
            quoted: false,
        }
    }

    fn render(&self, ctx: &RenderContext, out: &mut String) {
        if ctx.schema_required() {
            if let Some(schema) = &self.schema {
                schema.render(out);
                out.push('.');
            }
        }
        push_ident(out, &self.name, self.quoted);
    }
}

/// One node of the SQL expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value; `raw` text renders verbatim, non-raw strings render
    /// single-quoted (escaping is a collaborator's concern).
    Literal { value: Lit, raw: bool },
    /// A bound-parameter marker: `$n`. Tagged placeholders reuse their
    /// index within one render.
    Placeholder { tag: Option<String> },
    /// An optionally qualified, optionally quoted column name.
    Column {
        name: String,
        relation: Option<RelationRef>,
        quoted: bool,
    },
    Relation(RelationRef),
    Schema(SchemaRef),
    /// `(left op right)`; always parenthesized for composability.
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    /// Prefix or postfix operator application.
    Unary {
        op: String,
        expr: Box<Expr>,
        prefix: bool,
    },
    /// N sub-expressions joined by one repeated AND/OR, parenthesized.
    Logical { op: LogicalOp, exprs: Vec<Expr> },
    /// `name(arg, arg, ...)`
    Func { name: String, args: Vec<Expr> },
    /// `(expr)::type`
    Cast { expr: Box<Expr>, ty: String },
    /// `(expr) AS name`
    Alias { expr: Box<Expr>, name: String },
    /// `ARRAY[elem, elem, ...]`
    ArrayLiteral(Vec<Expr>),
    /// `column=value`; the only node sensitive to the write mode.
    Assign { column: Box<Expr>, value: Box<Expr> },
    /// `(expr)`
    Group(Box<Expr>),
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::raw(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::raw(s)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::literal(Lit::Int(i64::from(v)))
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::literal(Lit::Int(v))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::literal(Lit::Float(v))
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::literal(Lit::Bool(v))
    }
}

impl From<RelationRef> for Expr {
    fn from(r: RelationRef) -> Self {
        Expr::Relation(r)
    }
}

impl From<SchemaRef> for Expr {
    fn from(s: SchemaRef) -> Self {
        Expr::Schema(s)
    }
}

impl Expr {
    /// A literal node.
    pub fn literal(value: impl Into<Lit>) -> Expr {
        Expr::Literal {
            value: value.into(),
            raw: false,
        }
    }

    /// A verbatim fragment: identifiers or pre-escaped text.
    pub fn raw(text: impl Into<String>) -> Expr {
        Expr::Literal {
            value: Lit::Text(text.into()),
            raw: true,
        }
    }

    /// The `*` projection.
    pub fn star() -> Expr {
        Expr::raw("*")
    }

    /// An untagged placeholder: consumes the next index on every render.
    pub fn placeholder() -> Expr {
        Expr::Placeholder { tag: None }
    }

    /// A tagged placeholder: one index per distinct tag per statement.
    pub fn tagged(tag: impl Into<String>) -> Expr {
        Expr::Placeholder {
            tag: Some(tag.into()),
        }
    }

    /// An unqualified column.
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column {
            name: name.into(),
            relation: None,
            quoted: false,
        }
    }

    /// A relation node.
    pub fn relation(name: impl Into<String>) -> Expr {
        Expr::Relation(RelationRef::new(name))
    }

    /// A schema-name node.
    pub fn schema(name: impl Into<String>) -> Expr {
        Expr::Schema(SchemaRef::new(name))
    }

    /// Render a column double-quoted. No-op on other node kinds.
    pub fn quote(self) -> Expr {
        match self {
            Expr::Column { name, relation, .. } => Expr::Column {
                name,
                relation,
                quoted: true,
            },
            other => other,
        }
    }

    /// An arbitrary binary operation.
    pub fn binary(left: impl Into<Expr>, op: impl Into<String>, right: impl Into<Expr>) -> Expr {
        Expr::Binary {
            left: Box::new(left.into()),
            op: op.into(),
            right: Box::new(right.into()),
        }
    }

    /// A prefix unary operation.
    pub fn prefix(op: impl Into<String>, expr: impl Into<Expr>) -> Expr {
        Expr::Unary {
            op: op.into(),
            expr: Box::new(expr.into()),
            prefix: true,
        }
    }

    /// A postfix unary operation.
    pub fn postfix(expr: impl Into<Expr>, op: impl Into<String>) -> Expr {
        Expr::Unary {
            op: op.into(),
            expr: Box::new(expr.into()),
            prefix: false,
        }
    }

    /// A conjunctive group.
    pub fn and(exprs: Vec<Expr>) -> Expr {
        Expr::Logical {
            op: LogicalOp::And,
            exprs,
        }
    }

    /// A disjunctive group.
    pub fn or(exprs: Vec<Expr>) -> Expr {
        Expr::Logical {
            op: LogicalOp::Or,
            exprs,
        }
    }

    /// A function call.
    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Func {
            name: name.into(),
            args,
        }
    }

    /// An array literal.
    pub fn array(elems: Vec<Expr>) -> Expr {
        Expr::ArrayLiteral(elems)
    }

    // ==================== chaining ====================

    /// Assignment of a value to this column.
    pub fn assign(self, value: impl Into<Expr>) -> Expr {
        Expr::Assign {
            column: Box::new(self),
            value: Box::new(value.into()),
        }
    }

    pub fn eq(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "=", rhs)
    }

    pub fn ne(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "<>", rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, ">", rhs)
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "<", rhs)
    }

    pub fn ge(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, ">=", rhs)
    }

    pub fn le(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "<=", rhs)
    }

    pub fn is(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, " IS ", rhs)
    }

    pub fn is_not(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, " IS NOT ", rhs)
    }

    pub fn add(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "+", rhs)
    }

    pub fn sub(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "-", rhs)
    }

    pub fn mul(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "*", rhs)
    }

    pub fn div(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "/", rhs)
    }

    pub fn rem(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "%", rhs)
    }

    pub fn pow(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "^", rhs)
    }

    pub fn concat(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "||", rhs)
    }

    pub fn like(self, pattern: impl Into<Expr>) -> Expr {
        Expr::binary(self, " ~~ ", pattern)
    }

    pub fn ilike(self, pattern: impl Into<Expr>) -> Expr {
        Expr::binary(self, " ~~* ", pattern)
    }

    pub fn not_like(self, pattern: impl Into<Expr>) -> Expr {
        Expr::binary(self, " !~~ ", pattern)
    }

    pub fn not_ilike(self, pattern: impl Into<Expr>) -> Expr {
        Expr::binary(self, " !~~* ", pattern)
    }

    pub fn similar_to(self, pattern: impl Into<Expr>) -> Expr {
        Expr::binary(self, " SIMILAR TO ", pattern)
    }

    pub fn matches(self, pattern: impl Into<Expr>, case_sensitive: bool) -> Expr {
        Expr::binary(self, if case_sensitive { "~" } else { "~*" }, pattern)
    }

    pub fn not_matches(self, pattern: impl Into<Expr>, case_sensitive: bool) -> Expr {
        Expr::binary(self, if case_sensitive { "!~" } else { "!~*" }, pattern)
    }

    pub fn contains(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "@>", rhs)
    }

    pub fn contained_by(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "<@", rhs)
    }

    pub fn overlaps(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "&&", rhs)
    }

    pub fn bit_and(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "&", rhs)
    }

    pub fn bit_or(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "|", rhs)
    }

    pub fn shl(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, "<<", rhs)
    }

    pub fn shr(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(self, ">>", rhs)
    }

    /// Arithmetic negation.
    pub fn neg(self) -> Expr {
        Expr::prefix("-", self)
    }

    /// Logical negation.
    pub fn not_(self) -> Expr {
        Expr::prefix(" NOT ", self)
    }

    /// Ascending ordering suffix.
    pub fn asc(self) -> Expr {
        Expr::postfix(self, " ASC")
    }

    /// Descending ordering suffix.
    pub fn desc(self) -> Expr {
        Expr::postfix(self, " DESC")
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    pub fn cast(self, ty: impl Into<String>) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            ty: ty.into(),
        }
    }

    pub fn group(self) -> Expr {
        Expr::Group(Box::new(self))
    }

    /// AND this expression with another, flattening existing AND groups.
    pub fn and_also(self, other: impl Into<Expr>) -> Expr {
        match self {
            Expr::Logical {
                op: LogicalOp::And,
                mut exprs,
            } => {
                exprs.push(other.into());
                Expr::Logical {
                    op: LogicalOp::And,
                    exprs,
                }
            }
            first => Expr::and(vec![first, other.into()]),
        }
    }

    /// OR this expression with another, flattening existing OR groups.
    pub fn or_else(self, other: impl Into<Expr>) -> Expr {
        match self {
            Expr::Logical {
                op: LogicalOp::Or,
                mut exprs,
            } => {
                exprs.push(other.into());
                Expr::Logical {
                    op: LogicalOp::Or,
                    exprs,
                }
            }
            first => Expr::or(vec![first, other.into()]),
        }
    }

    // ==================== rendering ====================

    /// Render this node into `out`.
    ///
    /// On error the buffer contents are unspecified and must be discarded.
    pub fn render(&self, ctx: &mut RenderContext, out: &mut String) -> CraftResult<()> {
        match self {
            Expr::Literal { value, raw } => {
                match value {
                    Lit::Text(s) if *raw => out.push_str(s),
                    Lit::Text(s) => {
                        out.push('\'');
                        out.push_str(s);
                        out.push('\'');
                    }
                    Lit::Int(v) => out.push_str(&v.to_string()),
                    Lit::Float(v) => out.push_str(&v.to_string()),
                    Lit::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
                }
                Ok(())
            }
            Expr::Placeholder { tag } => {
                let index = match tag {
                    Some(tag) => ctx.tag_index(tag),
                    None => ctx.next_index(),
                };
                out.push('$');
                out.push_str(&index.to_string());
                Ok(())
            }
            Expr::Column {
                name,
                relation,
                quoted,
            } => {
                if let Some(relation) = relation {
                    relation.render(ctx, out);
                    out.push('.');
                }
                push_ident(out, name, *quoted);
                Ok(())
            }
            Expr::Relation(r) => {
                r.render(ctx, out);
                Ok(())
            }
            Expr::Schema(s) => {
                s.render(out);
                Ok(())
            }
            Expr::Binary { left, op, right } => {
                out.push('(');
                left.render(ctx, out)?;
                out.push_str(op);
                right.render(ctx, out)?;
                out.push(')');
                Ok(())
            }
            Expr::Unary { op, expr, prefix } => {
                if *prefix {
                    out.push_str(op);
                }
                expr.render(ctx, out)?;
                if !*prefix {
                    out.push_str(op);
                }
                Ok(())
            }
            Expr::Logical { op, exprs } => {
                if exprs.is_empty() {
                    return Err(CraftError::render("empty logical group"));
                }
                out.push('(');
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(op.sql());
                    }
                    expr.render(ctx, out)?;
                }
                out.push(')');
                Ok(())
            }
            Expr::Func { name, args } => {
                if name.is_empty() {
                    return Err(CraftError::render("function call with an empty name"));
                }
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.render(ctx, out)?;
                }
                out.push(')');
                Ok(())
            }
            Expr::Cast { expr, ty } => {
                if ty.is_empty() {
                    return Err(CraftError::render("cast with an empty type name"));
                }
                out.push('(');
                expr.render(ctx, out)?;
                out.push_str(")::");
                out.push_str(ty);
                Ok(())
            }
            Expr::Alias { expr, name } => {
                if name.is_empty() {
                    return Err(CraftError::render("alias with an empty name"));
                }
                out.push('(');
                expr.render(ctx, out)?;
                out.push_str(") AS ");
                out.push_str(name);
                Ok(())
            }
            Expr::ArrayLiteral(elems) => {
                out.push_str("ARRAY[");
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    elem.render(ctx, out)?;
                }
                out.push(']');
                Ok(())
            }
            Expr::Assign { column, value } => {
                let mode = ctx.write_mode();
                if mode != WriteMode::ValueOnly {
                    column.render(ctx, out)?;
                }
                if mode == WriteMode::Regular {
                    out.push('=');
                }
                if mode != WriteMode::ColumnOnly {
                    value.render(ctx, out)?;
                }
                Ok(())
            }
            Expr::Group(expr) => {
                out.push('(');
                expr.render(ctx, out)?;
                out.push(')');
                Ok(())
            }
        }
    }
}

impl From<i64> for Lit {
    fn from(v: i64) -> Self {
        Lit::Int(v)
    }
}

impl From<i32> for Lit {
    fn from(v: i32) -> Self {
        Lit::Int(i64::from(v))
    }
}

impl From<f64> for Lit {
    fn from(v: f64) -> Self {
        Lit::Float(v)
    }
}

impl From<bool> for Lit {
    fn from(v: bool) -> Self {
        Lit::Bool(v)
    }
}

impl From<&str> for Lit {
    fn from(v: &str) -> Self {
        Lit::Text(v.to_string())
    }
}

impl From<String> for Lit {
    fn from(v: String) -> Self {
        Lit::Text(v)
    }
}

fn push_ident(out: &mut String, name: &str, quoted: bool) {
    if quoted {
        out.push('"');
        out.push_str(name);
        out.push('"');
    } else {
        out.push_str(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &Expr) -> String {
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        expr.render(&mut ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn literal_canonical_forms() {
        assert_eq!(render(&Expr::literal(12i64)), "12");
        assert_eq!(render(&Expr::literal(13.5)), "13.5");
        assert_eq!(render(&Expr::literal(false)), "false");
        assert_eq!(render(&Expr::literal("string")), "'string'");
    }

    #[test]
    fn raw_renders_verbatim() {
        assert_eq!(render(&Expr::raw("count(*)")), "count(*)");
        assert_eq!(render(&Expr::from("tbl.col")), "tbl.col");
        assert_eq!(render(&Expr::star()), "*");
    }

    #[test]
    fn binary_always_parenthesizes() {
        let e = Expr::column("a").eq(Expr::placeholder());
        assert_eq!(render(&e), "(a=$1)");

        let nested = Expr::column("a").add(Expr::column("b")).mul(2i64);
        assert_eq!(render(&nested), "((a+b)*2)");
    }

    #[test]
    fn unary_prefix_and_postfix() {
        assert_eq!(render(&Expr::literal(3i64).neg()), "-3");
        assert_eq!(render(&Expr::column("ok").not_()), " NOT ok");
        assert_eq!(render(&Expr::column("ts").asc()), "ts ASC");
        assert_eq!(render(&Expr::column("ts").desc()), "ts DESC");
    }

    #[test]
    fn logical_group_joins_and_parenthesizes() {
        let e = Expr::and(vec![
            Expr::column("a").eq(1i64),
            Expr::or(vec![
                Expr::column("b").eq(2i64),
                Expr::column("c").eq(3i64),
            ]),
        ]);
        assert_eq!(render(&e), "((a=1) AND ((b=2) OR (c=3)))");
    }

    #[test]
    fn empty_logical_group_is_a_render_error() {
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        let err = Expr::and(vec![]).render(&mut ctx, &mut out).unwrap_err();
        assert!(matches!(err, CraftError::Render(_)));
    }

    #[test]
    fn placeholders_number_sequentially() {
        let e = Expr::and(vec![
            Expr::column("a").eq(Expr::placeholder()),
            Expr::column("b").eq(Expr::placeholder()),
        ]);
        assert_eq!(render(&e), "((a=$1) AND (b=$2))");
    }

    #[test]
    fn tagged_placeholder_reuses_index() {
        let e = Expr::and(vec![
            Expr::column("a").eq(Expr::tagged("x")),
            Expr::column("b").eq(Expr::tagged("x")),
            Expr::column("c").eq(Expr::tagged("y")),
        ]);
        assert_eq!(render(&e), "((a=$1) AND (b=$1) AND (c=$2))");
    }

    #[test]
    fn column_qualification_and_quoting() {
        let rel = RelationRef::new("users");
        assert_eq!(render(&rel.column("id")), "users.id");
        assert_eq!(render(&Expr::column("Name").quote()), "\"Name\"");
    }

    #[test]
    fn relation_schema_only_when_required() {
        let rel = RelationRef::new("users").in_schema(SchemaRef::new("app"));
        let expr = Expr::from(rel);

        assert_eq!(render(&expr), "users");

        let mut ctx = RenderContext::new();
        ctx.set_schema_required(true);
        let mut out = String::new();
        expr.render(&mut ctx, &mut out).unwrap();
        assert_eq!(out, "app.users");
    }

    #[test]
    fn func_cast_alias_array() {
        let e = Expr::func("coalesce", vec![Expr::column("a"), Expr::literal(0i64)]);
        assert_eq!(render(&e), "coalesce(a,0)");

        assert_eq!(render(&Expr::column("a").cast("bigint")), "(a)::bigint");
        assert_eq!(render(&Expr::column("a").alias("total")), "(a) AS total");
        assert_eq!(
            render(&Expr::array(vec![
                Expr::literal(1i64),
                Expr::literal("two"),
                Expr::column("three"),
            ])),
            "ARRAY[1,'two',three]"
        );
        assert_eq!(render(&Expr::array(vec![])), "ARRAY[]");
    }

    #[test]
    fn assignment_respects_write_mode() {
        let assign = Expr::column("a").assign(Expr::placeholder());
        let mut out = String::new();
        let mut ctx = RenderContext::new();

        assign.render(&mut ctx, &mut out).unwrap();
        assert_eq!(out, "a=$1");

        out.clear();
        let mut ctx = RenderContext::new();
        ctx.with_write_mode(WriteMode::ColumnOnly, |ctx| {
            assign.render(ctx, &mut out)
        })
        .unwrap();
        assert_eq!(out, "a");

        out.clear();
        let mut ctx = RenderContext::new();
        ctx.with_write_mode(WriteMode::ValueOnly, |ctx| assign.render(ctx, &mut out))
            .unwrap();
        assert_eq!(out, "$1");
    }

    #[test]
    fn and_also_flattens() {
        let e = Expr::column("a")
            .eq(1i64)
            .and_also(Expr::column("b").eq(2i64))
            .and_also(Expr::column("c").eq(3i64));
        assert_eq!(render(&e), "((a=1) AND (b=2) AND (c=3))");
    }
}
