//! Shared query infrastructure: the [`Query`] builder trait and [`SortDirection`].

use std::str::FromStr;

use serde_json::Value;

use super::document::QueryDocument;
use crate::Error;

/// Trait implemented by every snapshot query builder. Provides the chained
/// builder methods over the underlying [`QueryDocument`].
///
/// Each call consumes the builder and hands it back, so calls chain:
///
/// ```no_run
/// # use lookback_api::{Client, Query};
/// # async fn run() -> Result<(), lookback_api::Error> {
/// let client = Client::new()
///     .with_credentials("user@example.com", "secret")
///     .with_workspace("41529001");
/// let _result = client
///     .new_query()
///     .add_find_clause("_TypeHierarchy", -51038)
///     .require_fields(["ObjectID", "Name"])
///     .sort_by("_ValidFrom", -1)?
///     .execute()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub trait Query {
    /// Returns a mutable reference to the document being built.
    fn document_mut(&mut self) -> &mut QueryDocument;

    /// Sets the number of snapshots per page.
    fn with_page_size(mut self, page_size: u64) -> Self
    where
        Self: Sized,
    {
        self.document_mut().page_size = page_size;
        self
    }

    /// Sets the index of the first snapshot to return.
    fn with_start_index(mut self, start_index: u64) -> Self
    where
        Self: Sized,
    {
        self.document_mut().start_index = start_index;
        self
    }

    /// Requests every field of each snapshot (`fields: true`).
    fn with_all_fields(mut self) -> Self
    where
        Self: Sized,
    {
        self.document_mut().fields_true = true;
        self
    }

    /// Adds fields to the projection. Names already present are ignored.
    fn require_fields<I, S>(mut self, names: I) -> Self
    where
        Self: Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_mut()
            .fields
            .extend(names.into_iter().map(Into::<String>::into));
        self
    }

    /// Sorts by `field` in the given direction, which must be `1` or `-1`.
    ///
    /// A later call for the same field replaces the earlier direction.
    fn sort_by(self, field: &str, direction: i32) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let direction = SortDirection::try_from(direction)?;
        Ok(self.sort_by_direction(field, direction))
    }

    /// Sorts by `field` ascending.
    fn sort_ascending(self, field: &str) -> Self
    where
        Self: Sized,
    {
        self.sort_by_direction(field, SortDirection::Ascending)
    }

    /// Sorts by `field` in a typed direction.
    fn sort_by_direction(mut self, field: &str, direction: SortDirection) -> Self
    where
        Self: Sized,
    {
        self.document_mut()
            .sort
            .insert(field.to_string(), direction);
        self
    }

    /// Asks the service to resolve reference values of these fields.
    fn hydrate_fields<I, S>(mut self, names: I) -> Self
    where
        Self: Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_mut()
            .hydrate
            .extend(names.into_iter().map(Into::<String>::into));
        self
    }

    /// Sets the find predicate for `field`, replacing any earlier value.
    ///
    /// `value` is passed through as-is, so nested operators such as
    /// `{"$in": [...]}` or `$or` clause lists work unchanged.
    fn add_find_clause(mut self, field: &str, value: impl Into<Value>) -> Self
    where
        Self: Sized,
    {
        self.document_mut()
            .find
            .insert(field.to_string(), value.into());
        self
    }

    /// Sets an arbitrary request parameter. Properties are written last and
    /// win over the named parameters on key collision.
    fn add_property(mut self, name: &str, value: impl Into<Value>) -> Self
    where
        Self: Sized,
    {
        self.document_mut()
            .properties
            .insert(name.to_string(), value.into());
        self
    }
}

/// Sort order for a single field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending = 1,
    Descending = -1,
}

impl SortDirection {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for SortDirection {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SortDirection::Ascending),
            -1 => Ok(SortDirection::Descending),
            other => Err(Error::InvalidArgument(format!(
                "Sort only supports values of 1 or -1, got {}",
                other
            ))),
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "+1" | "asc" => Ok(SortDirection::Ascending),
            "-1" | "desc" => Ok(SortDirection::Descending),
            other => Err(Error::InvalidArgument(format!(
                "Unknown sort direction: {}",
                other
            ))),
        }
    }
}
