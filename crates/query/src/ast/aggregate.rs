//! Aggregate functions over a column.

use crate::ast::column::ColumnRef;
use core::fmt;

/// Aggregate functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Distinct,
    StdDev,
    GeoMean,
}

impl AggregateFunc {
    /// True if the function needs numeric input.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AggregateFunc::Sum | AggregateFunc::Avg | AggregateFunc::StdDev | AggregateFunc::GeoMean
        )
    }
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
            AggregateFunc::Distinct => "DISTINCT",
            AggregateFunc::StdDev => "STDDEV",
            AggregateFunc::GeoMean => "GEOMEAN",
        })
    }
}

/// An aggregate applied to a column. `COUNT` without a column counts rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregateColumn {
    pub func: AggregateFunc,
    pub column: Option<ColumnRef>,
}

impl AggregateColumn {
    pub fn new(func: AggregateFunc, column: ColumnRef) -> Self {
        Self {
            func,
            column: Some(column),
        }
    }

    /// `COUNT(*)`.
    pub fn count_all() -> Self {
        Self {
            func: AggregateFunc::Count,
            column: None,
        }
    }
}

impl fmt::Display for AggregateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(c) => write!(f, "{}({})", self.func, c),
            None => write!(f, "{}(*)", self.func),
        }
    }
}

pub fn count(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::Count, column.clone())
}

pub fn sum(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::Sum, column.clone())
}

pub fn avg(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::Avg, column.clone())
}

pub fn min(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::Min, column.clone())
}

pub fn max(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::Max, column.clone())
}

pub fn distinct(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::Distinct, column.clone())
}

pub fn stddev(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::StdDev, column.clone())
}

pub fn geomean(column: &ColumnRef) -> AggregateColumn {
    AggregateColumn::new(AggregateFunc::GeoMean, column.clone())
}
