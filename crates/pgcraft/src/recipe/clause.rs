//! Auxiliary statement clauses.
//!
//! Each clause renders itself with its leading keyword; a recipe
//! concatenates them in the order they were added. Clause ordering is not
//! validated here; emitting clauses in an order the server rejects is a
//! caller error.

use crate::error::{CraftError, CraftResult};
use crate::recipe::context::RenderContext;
use crate::recipe::expr::Expr;

/// Ordering direction for ORDER BY columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn suffix(self) -> &'static str {
        match self {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        }
    }
}

/// An auxiliary clause of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `HAVING <condition>`
    Having(Expr),
    /// `GROUP BY col, col, ...`
    GroupBy(Vec<Expr>),
    /// `ORDER BY col ASC, col DESC, ...`
    OrderBy(Vec<Expr>),
    /// `ON CONFLICT (targets) DO NOTHING | DO UPDATE SET ...`
    OnConflict {
        targets: Vec<Expr>,
        assignments: Vec<Expr>,
        do_nothing: bool,
    },
}

impl Clause {
    /// A HAVING clause; multiple conditions are ANDed.
    pub fn having<E: Into<Expr>>(conds: impl IntoIterator<Item = E>) -> Clause {
        Clause::Having(Expr::and(conds.into_iter().map(Into::into).collect()))
    }

    /// A GROUP BY clause.
    pub fn group_by<E: Into<Expr>>(cols: impl IntoIterator<Item = E>) -> Clause {
        Clause::GroupBy(cols.into_iter().map(Into::into).collect())
    }

    pub(crate) fn render(&self, ctx: &mut RenderContext, out: &mut String) -> CraftResult<()> {
        match self {
            Clause::Having(cond) => {
                out.push_str("HAVING ");
                cond.render(ctx, out)
            }
            Clause::GroupBy(cols) => {
                if cols.is_empty() {
                    return Err(CraftError::render("GROUP BY with no columns"));
                }
                out.push_str("GROUP BY ");
                render_list(cols, ctx, out)
            }
            Clause::OrderBy(cols) => {
                if cols.is_empty() {
                    return Err(CraftError::render("ORDER BY with no columns"));
                }
                out.push_str("ORDER BY ");
                render_list(cols, ctx, out)
            }
            Clause::OnConflict {
                targets,
                assignments,
                do_nothing,
            } => {
                if targets.is_empty() {
                    return Err(CraftError::render("ON CONFLICT with no target columns"));
                }
                out.push_str("ON CONFLICT (");
                render_list(targets, ctx, out)?;
                out.push(')');
                if *do_nothing || assignments.is_empty() {
                    out.push_str(" DO NOTHING");
                } else {
                    out.push_str(" DO UPDATE SET ");
                    render_list(assignments, ctx, out)?;
                }
                Ok(())
            }
        }
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

/// Fluent ORDER BY builder.
///
/// ```ignore
/// recipe.add_clause(OrderBy::new().desc(["created_at"]).asc(["id"]))
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy {
    cols: Vec<Expr>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append columns ordered in the given direction.
    pub fn by<E: Into<Expr>>(
        mut self,
        direction: Direction,
        cols: impl IntoIterator<Item = E>,
    ) -> Self {
        for col in cols {
            self.cols
                .push(Expr::postfix(col.into(), direction.suffix()));
        }
        self
    }

    pub fn asc<E: Into<Expr>>(self, cols: impl IntoIterator<Item = E>) -> Self {
        self.by(Direction::Asc, cols)
    }

    pub fn desc<E: Into<Expr>>(self, cols: impl IntoIterator<Item = E>) -> Self {
        self.by(Direction::Desc, cols)
    }
}

impl From<OrderBy> for Clause {
    fn from(order: OrderBy) -> Clause {
        Clause::OrderBy(order.cols)
    }
}

/// Fluent ON CONFLICT builder.
///
/// Without assignments (and without an explicit `do_nothing()`) the clause
/// still falls back to `DO NOTHING`: an empty write list leaves nothing to
/// update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnConflict {
    targets: Vec<Expr>,
    assignments: Vec<Expr>,
    do_nothing: bool,
}

impl OnConflict {
    pub fn new<E: Into<Expr>>(targets: impl IntoIterator<Item = E>) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            assignments: Vec::new(),
            do_nothing: false,
        }
    }

    /// Add a `DO UPDATE SET` assignment.
    pub fn write(mut self, column: impl Into<Expr>, value: impl Into<Expr>) -> Self {
        self.assignments.push(column.into().assign(value));
        self
    }

    /// Resolve the conflict by doing nothing.
    pub fn do_nothing(mut self) -> Self {
        self.do_nothing = true;
        self
    }
}

impl From<OnConflict> for Clause {
    fn from(c: OnConflict) -> Clause {
        Clause::OnConflict {
            targets: c.targets,
            assignments: c.assignments,
            do_nothing: c.do_nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(clause: &Clause) -> String {
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        clause.render(&mut ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn having_ands_conditions() {
        let clause = Clause::having([
            Expr::raw("count(*)").gt(1i64),
            Expr::raw("sum(n)").lt(10i64),
        ]);
        assert_eq!(render(&clause), "HAVING ((count(*)>1) AND (sum(n)<10))");
    }

    #[test]
    fn group_by_joins_columns() {
        let clause = Clause::group_by(["a", "b"]);
        assert_eq!(render(&clause), "GROUP BY a,b");
    }

    #[test]
    fn order_by_renders_direction_suffixes() {
        let clause: Clause = OrderBy::new().desc(["created_at"]).asc(["id"]).into();
        assert_eq!(render(&clause), "ORDER BY created_at DESC,id ASC");
    }

    #[test]
    fn on_conflict_do_nothing_fallback() {
        let clause: Clause = OnConflict::new(["id"]).into();
        assert_eq!(render(&clause), "ON CONFLICT (id) DO NOTHING");

        let explicit: Clause = OnConflict::new(["id"]).do_nothing().into();
        assert_eq!(render(&explicit), "ON CONFLICT (id) DO NOTHING");
    }

    #[test]
    fn on_conflict_do_update() {
        let clause: Clause = OnConflict::new(["id"])
            .write(Expr::column("n"), Expr::placeholder())
            .write(Expr::column("m"), Expr::raw("EXCLUDED.m"))
            .into();
        assert_eq!(
            render(&clause),
            "ON CONFLICT (id) DO UPDATE SET n=$1,m=EXCLUDED.m"
        );
    }

    #[test]
    fn empty_group_by_is_an_error() {
        let clause = Clause::GroupBy(vec![]);
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        assert!(clause.render(&mut ctx, &mut out).is_err());
    }
}
