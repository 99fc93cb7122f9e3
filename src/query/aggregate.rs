//! `aggregate`, `groupBy` and field counts, computed over the filtered rows.

use std::{cmp::Ordering, collections::BTreeMap};

use sea_orm::{ColumnTrait, ColumnType, IdenStatic};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Number, Value as JsonValue};

use super::{
    args::{FindManyArgs, column_names},
    filter::{Filter, Where},
    order::SortOrder,
    value::compare_json,
};
use crate::{
    error::{ClientError, ClientResult},
    schema::Record,
};

/// Which aggregates to compute, per field.
#[derive(Debug, Clone)]
pub struct AggregateSelection<C> {
    pub count_all: bool,
    pub count: Vec<C>,
    pub avg: Vec<C>,
    pub sum: Vec<C>,
    pub min: Vec<C>,
    pub max: Vec<C>,
}

impl<C> Default for AggregateSelection<C> {
    fn default() -> Self {
        Self {
            count_all: false,
            count: Vec::new(),
            avg: Vec::new(),
            sum: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
        }
    }
}

impl<C: ColumnTrait> AggregateSelection<C> {
    pub fn count_all(mut self) -> Self {
        self.count_all = true;
        self
    }

    pub fn count(mut self, column: C) -> Self {
        self.count.push(column);
        self
    }

    pub fn avg(mut self, column: C) -> Self {
        self.avg.push(column);
        self
    }

    pub fn sum(mut self, column: C) -> Self {
        self.sum.push(column);
        self
    }

    pub fn min(mut self, column: C) -> Self {
        self.min.push(column);
        self
    }

    pub fn max(mut self, column: C) -> Self {
        self.max.push(column);
        self
    }

    /// `_avg` and `_sum` only make sense on numbers.
    pub fn validate(&self) -> ClientResult<()> {
        for (op, column) in self
            .avg
            .iter()
            .map(|c| ("_avg", c))
            .chain(self.sum.iter().map(|c| ("_sum", c)))
        {
            ensure_numeric(op, *column)?;
        }
        Ok(())
    }

    /// Add the `_count`, `_avg`, `_sum`, `_min` and `_max` sections to `map`.
    pub(crate) fn write_json(&self, map: &mut Map<String, JsonValue>) {
        let section = |columns: &[C]| -> Map<String, JsonValue> {
            columns
                .iter()
                .map(|c| (c.as_str().to_string(), JsonValue::Bool(true)))
                .collect()
        };
        let mut count = section(&self.count);
        if self.count_all {
            count.insert("_all".into(), JsonValue::Bool(true));
        }
        if !count.is_empty() {
            map.insert("_count".into(), JsonValue::Object(count));
        }
        for (key, columns) in [
            ("_avg", &self.avg),
            ("_sum", &self.sum),
            ("_min", &self.min),
            ("_max", &self.max),
        ] {
            if !columns.is_empty() {
                map.insert(key.into(), JsonValue::Object(section(columns)));
            }
        }
    }

    pub fn compute(&self, rows: &[JsonValue]) -> AggregateResult {
        let mut result = AggregateResult::default();

        if self.count_all || !self.count.is_empty() {
            let mut counts = BTreeMap::new();
            if self.count_all {
                counts.insert("_all".to_string(), rows.len() as u64);
            }
            for column in &self.count {
                counts.insert(column.as_str().to_string(), count_non_null(rows, *column));
            }
            result.count = Some(counts);
        }
        if !self.avg.is_empty() {
            result.avg = Some(per_column(&self.avg, |c| average(rows, c)));
        }
        if !self.sum.is_empty() {
            result.sum = Some(per_column(&self.sum, |c| sum(rows, c)));
        }
        if !self.min.is_empty() {
            result.min = Some(per_column(&self.min, |c| extreme(rows, c, Ordering::Less)));
        }
        if !self.max.is_empty() {
            result.max = Some(per_column(&self.max, |c| extreme(rows, c, Ordering::Greater)));
        }
        result
    }
}

fn per_column<C: ColumnTrait>(
    columns: &[C],
    f: impl Fn(C) -> JsonValue,
) -> BTreeMap<String, JsonValue> {
    columns
        .iter()
        .map(|c| (c.as_str().to_string(), f(*c)))
        .collect()
}

pub(crate) fn is_numeric<C: ColumnTrait>(column: C) -> bool {
    matches!(
        column.def().get_column_type(),
        ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::Float
            | ColumnType::Double
            | ColumnType::Decimal(_)
    )
}

fn ensure_numeric<C: ColumnTrait>(op: &str, column: C) -> ClientResult<()> {
    if is_numeric(column) {
        Ok(())
    } else {
        Err(ClientError::validation(format!(
            "`{op}` requires a numeric field, `{}` is not numeric",
            column.as_str()
        )))
    }
}

fn field<'a, C: ColumnTrait>(row: &'a JsonValue, column: C) -> &'a JsonValue {
    row.get(column.as_str()).unwrap_or(&JsonValue::Null)
}

fn count_non_null<C: ColumnTrait>(rows: &[JsonValue], column: C) -> u64 {
    rows.iter().filter(|r| !field(r, column).is_null()).count() as u64
}

fn average<C: ColumnTrait>(rows: &[JsonValue], column: C) -> JsonValue {
    let values: Vec<f64> = rows.iter().filter_map(|r| field(r, column).as_f64()).collect();
    if values.is_empty() {
        return JsonValue::Null;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Number::from_f64(mean)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn sum<C: ColumnTrait>(rows: &[JsonValue], column: C) -> JsonValue {
    let values: Vec<&JsonValue> = rows
        .iter()
        .map(|r| field(r, column))
        .filter(|v| !v.is_null())
        .collect();
    if values.is_empty() {
        return JsonValue::Null;
    }
    if let Some(total) = values
        .iter()
        .try_fold(0i64, |acc, v| v.as_i64().and_then(|n| acc.checked_add(n)))
    {
        return JsonValue::from(total);
    }
    let total: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
    Number::from_f64(total)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn extreme<C: ColumnTrait>(rows: &[JsonValue], column: C, wanted: Ordering) -> JsonValue {
    rows.iter()
        .map(|r| field(r, column))
        .filter(|v| !v.is_null())
        .fold(None::<&JsonValue>, |best, v| match best {
            Some(b) if compare_json(v, b) != wanted => Some(b),
            _ => Some(v),
        })
        .cloned()
        .unwrap_or(JsonValue::Null)
}

/// `{ "_count": {...}, "_avg": {...}, ... }`; absent sections are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<BTreeMap<String, u64>>,
    #[serde(rename = "_avg", skip_serializing_if = "Option::is_none")]
    pub avg: Option<BTreeMap<String, JsonValue>>,
    #[serde(rename = "_sum", skip_serializing_if = "Option::is_none")]
    pub sum: Option<BTreeMap<String, JsonValue>>,
    #[serde(rename = "_min", skip_serializing_if = "Option::is_none")]
    pub min: Option<BTreeMap<String, JsonValue>>,
    #[serde(rename = "_max", skip_serializing_if = "Option::is_none")]
    pub max: Option<BTreeMap<String, JsonValue>>,
}

pub struct AggregateArgs<R: Record> {
    pub query: FindManyArgs<R>,
    pub select: AggregateSelection<R::Column>,
}

impl<R: Record> AggregateArgs<R> {
    pub fn new(select: AggregateSelection<R::Column>) -> Self {
        Self {
            query: FindManyArgs::default(),
            select,
        }
    }

    pub fn filter(mut self, where_: Where<R::Column>) -> Self {
        self.query.where_ = where_;
        self
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        self.query.write_json(&mut map);
        self.select.write_json(&mut map);
        JsonValue::Object(map)
    }
}

/// `count` with a field selection: `_all` plus non-null counts per field.
pub struct CountArgs<R: Record> {
    pub query: FindManyArgs<R>,
    pub select: Vec<R::Column>,
}

impl<R: Record> CountArgs<R> {
    pub fn new(select: impl IntoIterator<Item = R::Column>) -> Self {
        Self {
            query: FindManyArgs::default(),
            select: select.into_iter().collect(),
        }
    }

    pub fn filter(mut self, where_: Where<R::Column>) -> Self {
        self.query.where_ = where_;
        self
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        self.query.write_json(&mut map);
        let mut select: Map<String, JsonValue> = self
            .select
            .iter()
            .map(|c| (c.as_str().to_string(), JsonValue::Bool(true)))
            .collect();
        select.insert("_all".into(), JsonValue::Bool(true));
        map.insert("select".into(), JsonValue::Object(select));
        JsonValue::Object(map)
    }
}

pub type CountResult = BTreeMap<String, u64>;

/// A value computed per group: a grouped field or an aggregate of one.
#[derive(Debug, Clone, Copy)]
pub enum Metric<C> {
    Field(C),
    CountAll,
    Count(C),
    Avg(C),
    Sum(C),
    Min(C),
    Max(C),
}

impl<C: ColumnTrait> Metric<C> {
    fn eval(&self, rows: &[JsonValue]) -> JsonValue {
        match self {
            Metric::Field(c) => rows.first().map(|r| field(r, *c).clone()).unwrap_or_default(),
            Metric::CountAll => JsonValue::from(rows.len() as u64),
            Metric::Count(c) => JsonValue::from(count_non_null(rows, *c)),
            Metric::Avg(c) => average(rows, *c),
            Metric::Sum(c) => sum(rows, *c),
            Metric::Min(c) => extreme(rows, *c, Ordering::Less),
            Metric::Max(c) => extreme(rows, *c, Ordering::Greater),
        }
    }

    /// `(aggregate, field)` as written in `having` and `orderBy`. The aggregate is
    /// `None` for a grouped field.
    fn path(&self) -> (Option<&'static str>, String) {
        match self {
            Metric::Field(c) => (None, c.as_str().to_string()),
            Metric::CountAll => (Some("_count"), "_all".to_string()),
            Metric::Count(c) => (Some("_count"), c.as_str().to_string()),
            Metric::Avg(c) => (Some("_avg"), c.as_str().to_string()),
            Metric::Sum(c) => (Some("_sum"), c.as_str().to_string()),
            Metric::Min(c) => (Some("_min"), c.as_str().to_string()),
            Metric::Max(c) => (Some("_max"), c.as_str().to_string()),
        }
    }

    fn validate(&self, by: &[C]) -> ClientResult<()> {
        match self {
            Metric::Field(c) if !by.iter().any(|b| b.as_str() == c.as_str()) => {
                Err(ClientError::validation(format!(
                    "field `{}` is used in `orderBy` or `having` but is missing from `by`",
                    c.as_str()
                )))
            }
            Metric::Avg(c) => ensure_numeric("_avg", *c),
            Metric::Sum(c) => ensure_numeric("_sum", *c),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Having<C> {
    pub metric: Metric<C>,
    pub filter: Filter,
}

#[derive(Debug, Clone, Copy)]
pub struct GroupOrderBy<C> {
    pub metric: Metric<C>,
    pub order: SortOrder,
}

pub struct GroupByArgs<R: Record> {
    pub by: Vec<R::Column>,
    pub where_: Where<R::Column>,
    pub having: Vec<Having<R::Column>>,
    pub order_by: Vec<GroupOrderBy<R::Column>>,
    pub take: Option<i64>,
    pub skip: Option<u64>,
    pub select: AggregateSelection<R::Column>,
}

impl<R: Record> GroupByArgs<R> {
    pub fn new(by: impl IntoIterator<Item = R::Column>) -> Self {
        Self {
            by: by.into_iter().collect(),
            where_: Where::all(),
            having: Vec::new(),
            order_by: Vec::new(),
            take: None,
            skip: None,
            select: AggregateSelection::default(),
        }
    }

    pub fn filter(mut self, where_: Where<R::Column>) -> Self {
        self.where_ = where_;
        self
    }

    pub fn select(mut self, select: AggregateSelection<R::Column>) -> Self {
        self.select = select;
        self
    }

    pub fn having(mut self, metric: Metric<R::Column>, filter: Filter) -> Self {
        self.having.push(Having { metric, filter });
        self
    }

    pub fn order_by(mut self, metric: Metric<R::Column>, order: SortOrder) -> Self {
        self.order_by.push(GroupOrderBy { metric, order });
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("by".into(), column_names(&self.by));
        map.insert("where".into(), self.where_.to_json());

        if !self.having.is_empty() {
            let mut having: BTreeMap<String, Map<String, JsonValue>> = BTreeMap::new();
            for h in &self.having {
                let (op, field) = h.metric.path();
                let JsonValue::Object(filter) = h.filter.to_json() else {
                    continue;
                };
                let target = having.entry(field).or_default();
                match op {
                    None => target.extend(filter),
                    Some(op) => {
                        if let JsonValue::Object(ops) = target
                            .entry(op.to_string())
                            .or_insert_with(|| JsonValue::Object(Map::new()))
                        {
                            ops.extend(filter);
                        }
                    }
                }
            }
            let having = having
                .into_iter()
                .map(|(field, ops)| (field, JsonValue::Object(ops)))
                .collect();
            map.insert("having".into(), JsonValue::Object(having));
        }

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|o| {
                    let (op, field) = o.metric.path();
                    let leaf = Map::from_iter([(field, JsonValue::from(o.order.as_str()))]);
                    match op {
                        None => JsonValue::Object(leaf),
                        Some(op) => JsonValue::Object(Map::from_iter([(
                            op.to_string(),
                            JsonValue::Object(leaf),
                        )])),
                    }
                })
                .collect();
            map.insert("orderBy".into(), JsonValue::Array(order));
        }
        if let Some(take) = self.take {
            map.insert("take".into(), take.into());
        }
        if let Some(skip) = self.skip {
            map.insert("skip".into(), skip.into());
        }
        self.select.write_json(&mut map);
        JsonValue::Object(map)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.by.is_empty() {
            return Err(ClientError::validation("`by` must name at least one field"));
        }
        self.select.validate()?;
        for having in &self.having {
            having.metric.validate(&self.by)?;
        }
        for order in &self.order_by {
            order.metric.validate(&self.by)?;
        }
        Ok(())
    }

    /// Partition `rows` (already filtered) and compute one output row per group.
    pub fn compute(&self, rows: &[JsonValue]) -> ClientResult<Vec<GroupByRow>> {
        self.validate()?;

        let mut groups: Vec<(Vec<JsonValue>, Vec<JsonValue>)> = Vec::new();
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for row in rows {
            let key: Vec<JsonValue> = self.by.iter().map(|c| field(row, *c).clone()).collect();
            let slot = *index
                .entry(JsonValue::Array(key.clone()).to_string())
                .or_insert_with(|| {
                    groups.push((key, Vec::new()));
                    groups.len() - 1
                });
            groups[slot].1.push(row.clone());
        }

        groups.retain(|(_, members)| {
            self.having
                .iter()
                .all(|h| h.filter.matches(&h.metric.eval(members)))
        });

        groups.sort_by(|(a_key, a_rows), (b_key, b_rows)| {
            for order in &self.order_by {
                let ord = compare_json(&order.metric.eval(a_rows), &order.metric.eval(b_rows));
                let ord = match order.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a_key
                .iter()
                .zip(b_key)
                .map(|(a, b)| compare_json(a, b))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let skip = self.skip.unwrap_or(0) as usize;
        let window: Vec<_> = match self.take {
            Some(take) if take < 0 => {
                let kept = groups.len().saturating_sub(skip);
                let start = kept.saturating_sub(take.unsigned_abs() as usize);
                groups.into_iter().take(kept).skip(start).collect()
            }
            Some(take) => groups.into_iter().skip(skip).take(take as usize).collect(),
            None => groups.into_iter().skip(skip).collect(),
        };

        Ok(window
            .into_iter()
            .map(|(key, members)| GroupByRow {
                fields: self
                    .by
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .zip(key)
                    .collect(),
                aggregates: self.select.compute(&members),
            })
            .collect())
    }
}

/// One group: the `by` fields plus the selected aggregates, flattened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupByRow {
    #[serde(flatten)]
    pub fields: BTreeMap<String, JsonValue>,
    #[serde(flatten)]
    pub aggregates: AggregateResult,
}

const AGGREGATE_KEYS: [&str; 5] = ["_count", "_avg", "_sum", "_min", "_max"];

impl<'de> Deserialize<'de> for GroupByRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Map::<String, JsonValue>::deserialize(deserializer)?;
        let (aggregates, fields): (Map<String, JsonValue>, Map<String, JsonValue>) = entries
            .into_iter()
            .partition(|(key, _)| AGGREGATE_KEYS.contains(&key.as_str()));
        let aggregates = AggregateResult::deserialize(JsonValue::Object(aggregates))
            .map_err(D::Error::custom)?;
        Ok(Self {
            fields: fields.into_iter().collect(),
            aggregates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::products::{Column, Entity};
    use serde_json::json;

    fn rows() -> Vec<JsonValue> {
        vec![
            json!({ "category_id": "a", "price": 100, "quantity": 1, "name": "drill", "product_picture": null }),
            json!({ "category_id": "a", "price": 300, "quantity": 3, "name": "saw", "product_picture": "s.png" }),
            json!({ "category_id": "b", "price": 50, "quantity": 5, "name": "tape", "product_picture": null }),
        ]
    }

    #[test]
    fn aggregate_computes_each_section() {
        let select = AggregateSelection::default()
            .count_all()
            .count(Column::ProductPicture)
            .avg(Column::Price)
            .sum(Column::Quantity)
            .min(Column::Name)
            .max(Column::Price);
        let result = select.compute(&rows());

        let counts = result.count.unwrap();
        assert_eq!(counts["_all"], 3);
        assert_eq!(counts["product_picture"], 1);
        assert_eq!(result.avg.unwrap()["price"], json!(150.0));
        assert_eq!(result.sum.unwrap()["quantity"], json!(9));
        assert_eq!(result.min.unwrap()["name"], json!("drill"));
        assert_eq!(result.max.unwrap()["price"], json!(300));
    }

    #[test]
    fn empty_input_yields_nulls() {
        let result = AggregateSelection::default()
            .count_all()
            .avg(Column::Price)
            .sum(Column::Price)
            .compute(&[]);
        assert_eq!(result.count.unwrap()["_all"], 0);
        assert_eq!(result.avg.unwrap()["price"], JsonValue::Null);
        assert_eq!(result.sum.unwrap()["price"], JsonValue::Null);
    }

    #[test]
    fn avg_on_text_field_is_rejected() {
        let err = AggregateSelection::default()
            .avg(Column::Name)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn group_by_partitions_filters_and_orders() {
        let args = GroupByArgs::<Entity>::new([Column::CategoryId])
            .select(AggregateSelection::default().count_all().sum(Column::Price))
            .order_by(Metric::Sum(Column::Price), SortOrder::Desc);
        let out = args.compute(&rows()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].fields["category_id"], json!("a"));
        assert_eq!(out[0].aggregates.sum.as_ref().unwrap()["price"], json!(400));

        let having = GroupByArgs::<Entity>::new([Column::CategoryId])
            .having(Metric::CountAll, Filter::Gt(1i64.into()));
        let out = having.compute(&rows()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            serde_json::to_value(&out[0]).unwrap(),
            json!({ "category_id": "a" })
        );
    }

    #[test]
    fn group_row_reads_back_from_its_json() {
        let args = GroupByArgs::<Entity>::new([Column::CategoryId])
            .select(AggregateSelection::default().count_all().avg(Column::Price));
        let out = args.compute(&rows()).unwrap();
        let json = serde_json::to_value(&out[0]).unwrap();
        let back: GroupByRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, out[0]);
    }

    #[test]
    fn group_by_rejects_scalar_fields_outside_by() {
        let args = GroupByArgs::<Entity>::new([Column::CategoryId])
            .order_by(Metric::Field(Column::Name), SortOrder::Asc);
        assert!(matches!(args.validate(), Err(ClientError::Validation(_))));

        let args = GroupByArgs::<Entity>::new([Column::CategoryId])
            .having(Metric::Field(Column::Price), Filter::Gt(1i64.into()));
        assert!(args.validate().is_err());

        let args = GroupByArgs::<Entity>::new([Column::CategoryId])
            .having(Metric::Avg(Column::Price), Filter::Gt(1i64.into()));
        assert!(args.validate().is_ok());
    }
}
