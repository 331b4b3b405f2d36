//! Fluent construction of SELECT queries.
//!
//! Builder methods never fail on their own. The first misuse is recorded
//! and reported by [`SelectBuilder::build`], so a chain reads top to bottom
//! and the query is validated before anything runs.

use crate::ast::{AggregateColumn, ColumnRef, Predicate};
use crate::context::{Count, JoinClause, JoinType, OrderKey, Projection, QueryContext, TableRef};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use strata_core::schema::{Order, Schema};
use strata_core::{Error, Result, Value};

/// Builds a [`QueryContext`] against a schema.
///
/// ```
/// use strata_core::schema::{Order, Schema, TableBuilder};
/// use strata_core::DataType;
/// use strata_query::ast::col;
/// use strata_query::SelectBuilder;
///
/// let table = TableBuilder::new("Employee").unwrap()
///     .add_column("id", DataType::Int64).unwrap()
///     .add_primary_key(&["id"], false).unwrap()
///     .build().unwrap();
/// let schema = Schema::new().add_table(table).unwrap();
/// let id = col(&schema, "Employee", "id").unwrap();
///
/// let query = SelectBuilder::new(&schema)
///     .from("Employee")
///     .where_(id.gt(100i64))
///     .order_by(&id, Order::Desc)
///     .limit(20)
///     .build()
///     .unwrap();
/// assert_eq!(query.limit_value(), Some(20));
/// ```
pub struct SelectBuilder<'a> {
    schema: &'a Schema,
    ctx: QueryContext,
    columns_set: bool,
    error: Option<Error>,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            ctx: QueryContext::new(),
            columns_set: false,
            error: None,
        }
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(Error::invalid_query(message));
        }
    }

    fn add_table(&mut self, table: TableRef) -> Option<TableRef> {
        if let Err(e) = self.schema.table(&table.table) {
            if self.error.is_none() {
                self.error = Some(e);
            }
            return None;
        }
        Some(table)
    }

    /// Projection list. An empty list, or no call at all, selects every
    /// column of every table.
    pub fn select<I, P>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        if self.columns_set {
            self.fail("select() has already been called".to_string());
            return self;
        }
        self.columns_set = true;
        self.ctx.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a table to FROM. Several tables form a cross product.
    pub fn from(mut self, table: &str) -> Self {
        if let Some(t) = self.add_table(TableRef::new(table)) {
            self.ctx.from.push(t);
        }
        self
    }

    /// Adds a table to FROM under an alias.
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        if let Some(t) = self.add_table(TableRef::aliased(table, alias)) {
            self.ctx.from.push(t);
        }
        self
    }

    fn join(mut self, table: TableRef, join_type: JoinType, predicate: Predicate) -> Self {
        if join_type == JoinType::LeftOuter {
            match &predicate {
                Predicate::Join(p) if p.eval_type().is_comparison() => {}
                _ => {
                    self.fail(format!("outer join on {} needs a single column comparison", table));
                    return self;
                }
            }
        }
        if let Some(table) = self.add_table(table) {
            let predicate = self.ctx.register_predicate(predicate);
            self.ctx.joins.push(JoinClause {
                table,
                join_type,
                predicate,
            });
        }
        self
    }

    pub fn inner_join(self, table: &str, predicate: Predicate) -> Self {
        self.join(TableRef::new(table), JoinType::Inner, predicate)
    }

    pub fn inner_join_as(self, table: &str, alias: &str, predicate: Predicate) -> Self {
        self.join(TableRef::aliased(table, alias), JoinType::Inner, predicate)
    }

    pub fn left_outer_join(self, table: &str, predicate: Predicate) -> Self {
        self.join(TableRef::new(table), JoinType::LeftOuter, predicate)
    }

    pub fn left_outer_join_as(self, table: &str, alias: &str, predicate: Predicate) -> Self {
        self.join(TableRef::aliased(table, alias), JoinType::LeftOuter, predicate)
    }

    pub fn where_(mut self, predicate: Predicate) -> Self {
        if self.ctx.where_clause.is_some() {
            self.fail("where_() has already been called".to_string());
            return self;
        }
        let predicate = self.ctx.register_predicate(predicate);
        self.ctx.where_clause = Some(predicate);
        self
    }

    /// Adds a sort key. Keys apply in call order.
    pub fn order_by(mut self, key: impl Into<Projection>, order: Order) -> Self {
        self.ctx.order_by.push(OrderKey {
            key: key.into(),
            order,
        });
        self
    }

    pub fn group_by<'c, I>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = &'c ColumnRef>,
    {
        if !self.ctx.group_by.is_empty() {
            self.fail("group_by() has already been called".to_string());
            return self;
        }
        self.ctx.group_by = columns.into_iter().cloned().collect();
        if self.ctx.group_by.is_empty() {
            self.fail("group_by() needs at least one column".to_string());
        }
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        if self.ctx.limit.is_some() {
            self.fail("limit() has already been called".to_string());
            return self;
        }
        self.ctx.limit = Some(Count::Value(n));
        self
    }

    /// LIMIT taken from the `index`-th bound value.
    pub fn limit_binder(mut self, index: usize) -> Self {
        if self.ctx.limit.is_some() {
            self.fail("limit() has already been called".to_string());
            return self;
        }
        self.ctx.limit = Some(Count::Binder(index));
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        if self.ctx.skip.is_some() {
            self.fail("skip() has already been called".to_string());
            return self;
        }
        self.ctx.skip = Some(Count::Value(n));
        self
    }

    /// SKIP taken from the `index`-th bound value.
    pub fn skip_binder(mut self, index: usize) -> Self {
        if self.ctx.skip.is_some() {
            self.fail("skip() has already been called".to_string());
            return self;
        }
        self.ctx.skip = Some(Count::Binder(index));
        self
    }

    /// Values for the query's placeholders. Can be replaced later through
    /// [`QueryContext::bind`].
    pub fn bind(mut self, values: Vec<Value>) -> Self {
        self.ctx.bind(values);
        self
    }

    /// Validates the query and returns it.
    pub fn build(self) -> Result<QueryContext> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let ctx = self.ctx;
        if ctx.from.is_empty() {
            return Err(Error::invalid_query("from() has not been called"));
        }
        validate_scopes(&ctx)?;
        validate_projection(&ctx)?;
        Ok(ctx)
    }
}

fn validate_scopes(ctx: &QueryContext) -> Result<()> {
    let scopes: Vec<&str> = ctx.tables().into_iter().map(TableRef::scope).collect();
    let check = |column: &ColumnRef| {
        if scopes.contains(&column.scope()) {
            Ok(())
        } else {
            Err(Error::invalid_query(format!(
                "{} refers to a table that is not part of the query",
                column
            )))
        }
    };

    let mut columns: Vec<&ColumnRef> = Vec::new();
    if let Some(p) = &ctx.where_clause {
        columns.extend(p.columns());
    }
    for join in &ctx.joins {
        columns.extend(join.predicate.columns());
    }
    for projection in ctx.columns.iter().chain(ctx.order_by.iter().map(|o| &o.key)) {
        match projection {
            Projection::Column(c) => columns.push(c),
            Projection::Aggregate(a) => columns.extend(a.column.as_ref()),
        }
    }
    columns.extend(ctx.group_by.iter());
    columns.into_iter().try_for_each(check)
}

fn validate_projection(ctx: &QueryContext) -> Result<()> {
    for aggregate in ctx.aggregates() {
        check_aggregate(&aggregate)?;
    }

    if !ctx.group_by.is_empty() {
        if ctx.columns.is_empty() {
            return Err(Error::invalid_query("group_by() needs an explicit projection list"));
        }
        for projection in &ctx.columns {
            if let Projection::Column(c) = projection {
                if !ctx.group_by.contains(c) {
                    return Err(Error::invalid_query(format!(
                        "{} is neither aggregated nor part of group_by()",
                        c
                    )));
                }
            }
        }
        return Ok(());
    }

    let aggregated = ctx.columns.iter().filter(|p| p.is_aggregate()).count();
    if aggregated > 0 && aggregated < ctx.columns.len() {
        return Err(Error::invalid_query(
            "aggregated and non-aggregated columns cannot be mixed without group_by()",
        ));
    }
    Ok(())
}

fn check_aggregate(aggregate: &AggregateColumn) -> Result<()> {
    match &aggregate.column {
        Some(c) if aggregate.func.is_numeric() && !c.data_type.is_numeric() => {
            Err(Error::invalid_query(format!("{} needs a numeric column", aggregate)))
        }
        None if aggregate.func != crate::ast::AggregateFunc::Count => Err(Error::invalid_query(format!(
            "{} needs a column",
            aggregate.func
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::aggregate::{count, sum};
    use crate::ast::col;
    use alloc::vec;
    use strata_core::schema::TableBuilder;
    use strata_core::DataType;

    fn schema() -> Schema {
        let employee = TableBuilder::new("Employee")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("dept", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap();
        let dept = TableBuilder::new("Dept")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap();
        Schema::new().add_table(employee).unwrap().add_table(dept).unwrap()
    }

    fn message(result: Result<QueryContext>) -> String {
        match result {
            Err(Error::InvalidQuery { message }) => message,
            other => panic!("expected InvalidQuery, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_from() {
        let schema = schema();
        assert_eq!(message(SelectBuilder::new(&schema).build()), "from() has not been called");
    }

    #[test]
    fn test_unknown_table() {
        let schema = schema();
        let result = SelectBuilder::new(&schema).from("Nope").build();
        assert!(matches!(result, Err(Error::TableNotFound { .. })));
    }

    #[test]
    fn test_clause_called_twice() {
        let schema = schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let result = SelectBuilder::new(&schema)
            .from("Employee")
            .where_(id.gt(1i64))
            .where_(id.lt(5i64))
            .build();
        assert_eq!(message(result), "where_() has already been called");

        let result = SelectBuilder::new(&schema).from("Employee").limit(1).limit_binder(0).build();
        assert_eq!(message(result), "limit() has already been called");
    }

    #[test]
    fn test_projection_rules() {
        let schema = schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let dept = col(&schema, "Employee", "dept").unwrap();
        let name = col(&schema, "Employee", "name").unwrap();

        let mixed = SelectBuilder::new(&schema)
            .select([Projection::from(&id), count(&id).into()])
            .from("Employee")
            .build();
        assert!(message(mixed).contains("cannot be mixed"));

        let grouped = SelectBuilder::new(&schema)
            .select([Projection::from(&dept), count(&id).into()])
            .from("Employee")
            .group_by([&dept])
            .build();
        assert!(grouped.is_ok());

        let uncovered = SelectBuilder::new(&schema)
            .select([Projection::from(&id), count(&id).into()])
            .from("Employee")
            .group_by([&dept])
            .build();
        assert!(message(uncovered).contains("group_by"));

        let no_projection = SelectBuilder::new(&schema).from("Employee").group_by([&dept]).build();
        assert!(message(no_projection).contains("projection"));

        let non_numeric = SelectBuilder::new(&schema)
            .select([sum(&name)])
            .from("Employee")
            .build();
        assert!(message(non_numeric).contains("numeric"));
    }

    #[test]
    fn test_out_of_scope_column() {
        let schema = schema();
        let dept_id = col(&schema, "Dept", "id").unwrap();
        let result = SelectBuilder::new(&schema).from("Employee").where_(dept_id.eq(1i64)).build();
        assert!(message(result).contains("not part of the query"));
    }

    #[test]
    fn test_outer_join_needs_join_predicate() {
        let schema = schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let result = SelectBuilder::new(&schema)
            .from("Employee")
            .left_outer_join("Dept", id.eq(1i64))
            .build();
        assert!(message(result).contains("outer join"));
    }

    #[test]
    fn test_predicates_get_ids() {
        let schema = schema();
        let e_dept = col(&schema, "Employee", "dept").unwrap();
        let d_id = col(&schema, "Dept", "id").unwrap();
        let ctx = SelectBuilder::new(&schema)
            .from("Employee")
            .inner_join("Dept", e_dept.eq_col(&d_id))
            .where_(d_id.gt(3i64))
            .bind(vec![Value::Int64(1)])
            .build()
            .unwrap();
        assert_ne!(ctx.joins[0].predicate.id(), ctx.where_clause.as_ref().unwrap().id());
        assert_eq!(ctx.bound_values(), &[Value::Int64(1)]);
    }
}
