//! Recipe accumulator and terminal statement builds.

use crate::error::{CraftError, CraftResult};
use crate::recipe::clause::Clause;
use crate::recipe::context::{RenderContext, WriteMode};
use crate::recipe::expr::Expr;

/// A fluent accumulator for one SQL statement.
///
/// A recipe collects read expressions, write assignments, a conjunctive
/// condition, and auxiliary clauses, then is consumed by exactly one
/// terminal build ([`select`](Recipe::select), [`insert`](Recipe::insert),
/// [`update`](Recipe::update), [`delete`](Recipe::delete)), each rendering
/// through a fresh [`RenderContext`].
///
/// ```ignore
/// use pgcraft::{sql, Expr};
///
/// let q = sql()
///     .read("id")
///     .read("name")
///     .and_where(Expr::column("status").eq(Expr::placeholder()))
///     .select(["users"])?;
/// assert_eq!(q, "SELECT id,name FROM users WHERE ((status=$1))");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Recipe {
    read: Vec<Expr>,
    write: Vec<Expr>,
    cond: Option<Expr>,
    clauses: Vec<Clause>,
}

impl Recipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read expression (a SELECT column, or a RETURNING column for
    /// the write statements).
    pub fn read(mut self, expr: impl Into<Expr>) -> Self {
        self.read.push(expr.into());
        self
    }

    /// Add several read expressions.
    pub fn read_all<E: Into<Expr>>(mut self, exprs: impl IntoIterator<Item = E>) -> Self {
        self.read.extend(exprs.into_iter().map(Into::into));
        self
    }

    /// Add a write assignment.
    pub fn write(mut self, column: impl Into<Expr>, value: impl Into<Expr>) -> Self {
        self.write.push(column.into().assign(value));
        self
    }

    /// Add a condition; repeated calls AND together.
    pub fn and_where(mut self, cond: impl Into<Expr>) -> Self {
        let cond = cond.into();
        self.cond = Some(match self.cond.take() {
            Some(existing) => existing.and_also(cond),
            None => Expr::and(vec![cond]),
        });
        self
    }

    /// Append an auxiliary clause; clauses render in the order added.
    pub fn add_clause(mut self, clause: impl Into<Clause>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    /// Build a SELECT statement.
    ///
    /// With no tables the FROM clause is omitted (e.g. `SELECT 1`).
    pub fn select<E: Into<Expr>>(self, tables: impl IntoIterator<Item = E>) -> CraftResult<String> {
        self.validate_read()?;
        if self.read.is_empty() {
            return Err(CraftError::render(
                "SELECT requires at least one read expression",
            ));
        }
        let tables: Vec<Expr> = tables.into_iter().map(Into::into).collect();

        let mut ctx = RenderContext::new();
        let mut out = String::new();
        out.push_str("SELECT ");
        render_list(&self.read, &mut ctx, &mut out)?;
        if !tables.is_empty() {
            out.push_str(" FROM ");
            render_list(&tables, &mut ctx, &mut out)?;
        }
        self.render_condition(&mut ctx, &mut out)?;
        self.render_clauses(&mut ctx, &mut out)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %out, "rendered SELECT statement");
        Ok(out)
    }

    /// Build an INSERT statement.
    ///
    /// The write list renders twice, first in column-only mode and then in
    /// value-only mode, and the context returns to regular mode after.
    pub fn insert(self, table: impl Into<Expr>) -> CraftResult<String> {
        self.validate_read()?;
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        out.push_str("INSERT INTO ");
        table.into().render(&mut ctx, &mut out)?;
        if !self.write.is_empty() {
            out.push_str(" (");
            ctx.with_write_mode(WriteMode::ColumnOnly, |ctx| {
                render_list(&self.write, ctx, &mut out)
            })?;
            out.push_str(") VALUES (");
            ctx.with_write_mode(WriteMode::ValueOnly, |ctx| {
                render_list(&self.write, ctx, &mut out)
            })?;
            out.push(')');
        }
        self.render_returning(&mut ctx, &mut out)?;
        self.render_clauses(&mut ctx, &mut out)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %out, "rendered INSERT statement");
        Ok(out)
    }

    /// Build an UPDATE statement.
    pub fn update(self, table: impl Into<Expr>) -> CraftResult<String> {
        self.validate_read()?;
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        out.push_str("UPDATE ");
        table.into().render(&mut ctx, &mut out)?;
        if !self.write.is_empty() {
            out.push_str(" SET ");
            render_list(&self.write, &mut ctx, &mut out)?;
        }
        self.render_condition(&mut ctx, &mut out)?;
        self.render_returning(&mut ctx, &mut out)?;
        self.render_clauses(&mut ctx, &mut out)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %out, "rendered UPDATE statement");
        Ok(out)
    }

    /// Build a DELETE statement.
    pub fn delete(self, table: impl Into<Expr>) -> CraftResult<String> {
        self.validate_read()?;
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        out.push_str("DELETE FROM ");
        table.into().render(&mut ctx, &mut out)?;
        self.render_condition(&mut ctx, &mut out)?;
        self.render_returning(&mut ctx, &mut out)?;
        self.render_clauses(&mut ctx, &mut out)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %out, "rendered DELETE statement");
        Ok(out)
    }

    /// Read expressions may be any node except assignments, logical
    /// groups, relations, and schema names.
    fn validate_read(&self) -> CraftResult<()> {
        for expr in &self.read {
            let rejected = match expr {
                Expr::Assign { .. } => "an assignment",
                Expr::Logical { .. } => "a condition group",
                Expr::Relation(_) => "a relation",
                Expr::Schema(_) => "a schema name",
                _ => continue,
            };
            return Err(CraftError::render(format!(
                "{rejected} is not allowed in a read list"
            )));
        }
        Ok(())
    }

    fn render_condition(&self, ctx: &mut RenderContext, out: &mut String) -> CraftResult<()> {
        if let Some(cond) = &self.cond {
            out.push_str(" WHERE ");
            cond.render(ctx, out)?;
        }
        Ok(())
    }

    fn render_returning(&self, ctx: &mut RenderContext, out: &mut String) -> CraftResult<()> {
        if !self.read.is_empty() {
            out.push_str(" RETURNING ");
            render_list(&self.read, ctx, out)?;
        }
        Ok(())
    }

    fn render_clauses(&self, ctx: &mut RenderContext, out: &mut String) -> CraftResult<()> {
        for clause in &self.clauses {
            out.push(' ');
            clause.render(ctx, out)?;
        }
        Ok(())
    }
}

fn render_list(exprs: &[Expr], ctx: &mut RenderContext, out: &mut String) -> CraftResult<()> {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        expr.render(ctx, out)?;
    }
    Ok(())
}
