//! Filters, ordering, pagination and aggregation arguments shared by every delegate.

pub mod aggregate;
pub mod args;
pub mod filter;
pub mod order;
pub mod value;

pub use aggregate::{
    AggregateArgs, AggregateResult, AggregateSelection, CountArgs, CountResult, GroupByArgs,
    GroupByRow, GroupOrderBy, Having, Metric,
};
pub use args::{BatchPayload, FindManyArgs, NumberUpdate};
pub use filter::{Filter, Where};
pub use order::{OrderBy, SortOrder};
