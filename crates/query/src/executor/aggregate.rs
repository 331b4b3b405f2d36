//! Aggregate computation over a relation.
//!
//! Results are memoized on the relation itself under the aggregate's
//! display form, so projection and ORDER BY read the same value.

use crate::ast::{AggregateColumn, AggregateFunc};
use crate::executor::Relation;
use alloc::string::ToString;
use alloc::vec::Vec;
use hashbrown::HashSet;
use libm::{exp, log, sqrt};
use strata_core::{Result, Value};

/// Computes every aggregate in `aggregates` on `relation` and stores the
/// results on it. Already computed aggregates are skipped.
pub fn memoize(aggregates: &[AggregateColumn], relation: &mut Relation) -> Result<()> {
    for agg in aggregates {
        let key = agg.to_string();
        if agg.func == AggregateFunc::Distinct {
            if relation.get_distinct(&key).is_none() {
                let values = distinct(agg, relation)?;
                relation.set_distinct(key, values);
            }
        } else if relation.get_aggregate(&key).is_none() {
            let value = compute(agg, relation)?;
            relation.set_aggregate(key, value);
        }
    }
    Ok(())
}

/// The value of a single-valued aggregate on `relation`.
///
/// Nulls are ignored. On an empty input every aggregate but COUNT is
/// null; COUNT is zero.
pub fn compute(agg: &AggregateColumn, relation: &Relation) -> Result<Value> {
    let values = column_values(agg, relation)?;
    let value = match agg.func {
        AggregateFunc::Count => match &agg.column {
            None => Value::Int64(relation.len() as i64),
            Some(_) => Value::Int64(values.len() as i64),
        },
        AggregateFunc::Sum => sum(&values),
        AggregateFunc::Avg => mean(&numbers(&values)).map_or(Value::Null, Value::Float64),
        AggregateFunc::Min => values.iter().min().map_or(Value::Null, |v| (*v).clone()),
        AggregateFunc::Max => values.iter().max().map_or(Value::Null, |v| (*v).clone()),
        AggregateFunc::StdDev => std_dev(&numbers(&values)).map_or(Value::Null, Value::Float64),
        AggregateFunc::GeoMean => geo_mean(&numbers(&values)).map_or(Value::Null, Value::Float64),
        AggregateFunc::Distinct => Value::Int64(distinct(agg, relation)?.len() as i64),
    };
    Ok(value)
}

/// Distinct values of the aggregate's column, nulls included once, in
/// first-seen order.
pub fn distinct(agg: &AggregateColumn, relation: &Relation) -> Result<Vec<Value>> {
    let Some(column) = &agg.column else {
        return Ok(Vec::new());
    };
    let pos = relation.require_position(column)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in relation.iter() {
        let value = entry.get_field(pos).unwrap_or(&Value::Null);
        if seen.insert(value) {
            out.push(value.clone());
        }
    }
    Ok(out)
}

/// Non-null values of the aggregate's column. Empty for `COUNT(*)`.
fn column_values<'r>(agg: &AggregateColumn, relation: &'r Relation) -> Result<Vec<&'r Value>> {
    let Some(column) = &agg.column else {
        return Ok(Vec::new());
    };
    let pos = relation.require_position(column)?;
    Ok(relation
        .iter()
        .filter_map(|e| e.get_field(pos))
        .filter(|v| !v.is_null())
        .collect())
}

fn numbers(values: &[&Value]) -> Vec<f64> {
    values.iter().filter_map(|v| v.to_f64()).collect()
}

/// Integer inputs sum to an integer unless the sum overflows.
fn sum(values: &[&Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    let integral = values.iter().all(|v| matches!(v, Value::Int32(_) | Value::Int64(_)));
    if integral {
        let total = values
            .iter()
            .filter_map(|v| v.as_i64())
            .try_fold(0i64, |acc, v| acc.checked_add(v));
        if let Some(total) = total {
            return Value::Int64(total);
        }
    }
    Value::Float64(numbers(values).iter().sum())
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Population standard deviation.
fn std_dev(xs: &[f64]) -> Option<f64> {
    let m = mean(xs)?;
    let variance = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64;
    Some(sqrt(variance))
}

/// Undefined (null) when any input is zero or negative.
fn geo_mean(xs: &[f64]) -> Option<f64> {
    if xs.iter().any(|x| *x <= 0.0) {
        return None;
    }
    let logs: Vec<f64> = xs.iter().map(|x| log(*x)).collect();
    mean(&logs).map(exp)
}
