//! Strata Query - planning, optimization and execution.
//!
//! - `ast`: column references, predicates, aggregates, evaluators
//! - `context`: the bound, validated form of a query (`QueryContext`)
//! - `SelectBuilder`: builds a `QueryContext` against a schema
//! - `planner`: plan nodes and logical plan generation
//! - `optimizer`: rewrite passes and the index cost estimator
//! - `executor`: relations, join algorithms, aggregation, `QueryRunner`
//! - `tree`: the arena tree plans are made of
//!
//! `QueryEngine` strings these together.
//!
//! # Example
//!
//! ```rust
//! use strata_core::schema::{Order, Schema, TableBuilder};
//! use strata_core::{DataType, Value};
//! use strata_query::ast::col;
//! use strata_query::{QueryEngine, SelectBuilder};
//! use strata_storage::{Journal, Store};
//!
//! let employee = TableBuilder::new("Employee")
//!     .unwrap()
//!     .add_column("id", DataType::Int64)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"], false)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let schema = Schema::new().add_table(employee).unwrap();
//! let mut store = Store::new(&schema);
//! let mut journal = Journal::new(&schema, &mut store, &["Employee"]).unwrap();
//! let rows = (1..=200)
//!     .map(|i| journal.create_row(vec![Value::Int64(i), Value::String(format!("e{}", i))]))
//!     .collect();
//! journal.insert("Employee", rows).unwrap();
//! journal.commit().unwrap();
//!
//! let id = col(&schema, "Employee", "id").unwrap();
//! let query = SelectBuilder::new(&schema)
//!     .select([&id])
//!     .from("Employee")
//!     .where_(id.gt(100i64))
//!     .order_by(&id, Order::Asc)
//!     .limit(2)
//!     .build()
//!     .unwrap();
//!
//! let engine = QueryEngine::new(&schema, &store);
//! assert!(engine.explain(&query).unwrap().contains("index_range_scan(Employee.pkEmployee, (100, unbound], natural)"));
//! let result = engine.execute(&query).unwrap();
//! assert_eq!(result.to_values(), vec![vec![Value::Int64(101)], vec![Value::Int64(102)]]);
//! ```

#![no_std]

extern crate alloc;

pub mod ast;
mod builder;
pub mod config;
pub mod context;
pub mod executor;
pub mod optimizer;
pub mod planner;
pub mod tree;

pub use builder::SelectBuilder;
pub use config::EngineConfig;
pub use context::{JoinType, OrderKey, Projection, QueryContext, TableRef};
pub use executor::{QueryRunner, Relation};
pub use optimizer::{Optimizer, OptimizerContext};
pub use planner::{LogicalPlanGenerator, PlanNode, PlanTree};

use alloc::string::{String, ToString};
use strata_core::schema::Schema;
use strata_core::Result;
use strata_storage::Store;

/// Plans and runs queries over one store.
pub struct QueryEngine<'a> {
    schema: &'a Schema,
    store: &'a Store,
    config: EngineConfig,
    optimizer: Optimizer,
}

impl<'a> QueryEngine<'a> {
    pub fn new(schema: &'a Schema, store: &'a Store) -> Self {
        Self::with_config(schema, store, EngineConfig::default())
    }

    pub fn with_config(schema: &'a Schema, store: &'a Store, config: EngineConfig) -> Self {
        Self {
            schema,
            store,
            config,
            optimizer: Optimizer::new(),
        }
    }

    /// Replaces the optimizer, e.g. with a reduced pass list.
    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Binds `query` and produces its optimized plan.
    pub fn plan(&self, query: &QueryContext) -> Result<PlanTree> {
        let query = query.resolve()?;
        let plan = LogicalPlanGenerator::new(&query).generate()?;
        let ctx = OptimizerContext::new(self.schema, self.store, &self.config);
        self.optimizer.optimize(plan, &ctx)
    }

    /// The optimized plan as a tree dump.
    pub fn explain(&self, query: &QueryContext) -> Result<String> {
        Ok(self.plan(query)?.to_string())
    }

    pub fn execute(&self, query: &QueryContext) -> Result<Relation> {
        let plan = self.plan(query)?;
        QueryRunner::new(self.schema, self.store, &self.config).execute(&plan)
    }
}
