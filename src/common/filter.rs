// src/common/filter.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::common::db_utils::escape_like;

/// A column a listing may filter on. The SQL fragment is fixed per variant,
/// so no caller-provided text ever reaches the statement.
pub trait FilterColumn: Copy {
    fn sql(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Uuid(Uuid),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr<C> {
    Equals(C, FilterValue),
    Range {
        column: C,
        min: Option<FilterValue>,
        max: Option<FilterValue>,
    },
    InSet(C, Vec<FilterValue>),
    /// Case-insensitive substring match across one or more columns.
    Like(Vec<C>, String),
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value.clone() {
        FilterValue::Uuid(v) => qb.push_bind(v),
        FilterValue::Int(v) => qb.push_bind(v),
        FilterValue::Decimal(v) => qb.push_bind(v),
        FilterValue::Text(v) => qb.push_bind(v),
        FilterValue::Bool(v) => qb.push_bind(v),
        FilterValue::Timestamp(v) => qb.push_bind(v),
    };
}

/// Appends every filter as an `AND` clause. The builder must already hold a
/// `WHERE` clause.
pub fn push_filters<C: FilterColumn>(qb: &mut QueryBuilder<'_, Postgres>, filters: &[FilterExpr<C>]) {
    for filter in filters {
        match filter {
            FilterExpr::Equals(column, value) => {
                qb.push(" AND ").push(column.sql()).push(" = ");
                push_value(qb, value);
            }
            FilterExpr::Range { column, min, max } => {
                if let Some(min) = min {
                    qb.push(" AND ").push(column.sql()).push(" >= ");
                    push_value(qb, min);
                }
                if let Some(max) = max {
                    qb.push(" AND ").push(column.sql()).push(" <= ");
                    push_value(qb, max);
                }
            }
            FilterExpr::InSet(column, values) => {
                if values.is_empty() {
                    qb.push(" AND FALSE");
                    continue;
                }
                qb.push(" AND ").push(column.sql()).push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    push_value(qb, value);
                }
                qb.push(")");
            }
            FilterExpr::Like(columns, needle) => {
                if columns.is_empty() || needle.trim().is_empty() {
                    continue;
                }
                let pattern = format!("%{}%", escape_like(needle.trim()));
                qb.push(" AND (");
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(column.sql()).push(" ILIKE ");
                    qb.push_bind(pattern.clone());
                }
                qb.push(")");
            }
        }
    }
}
