//! The request document sent to the snapshot query endpoint.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::common::{Query, SortDirection};
use crate::Error;

/// Default number of snapshots per page.
pub const DEFAULT_PAGE_SIZE: u64 = 20000;

/// Filter, sort, projection and paging state of a single snapshot query.
///
/// Built through the [`Query`] trait. Serializes to one flat JSON object
/// with the keys `find`, `start`, `pagesize`, `fields`, `hydrate` and `sort`,
/// overlaid by any extra properties.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDocument {
    pub(crate) find: Map<String, Value>,
    pub(crate) sort: BTreeMap<String, SortDirection>,
    pub(crate) fields: BTreeSet<String>,
    pub(crate) fields_true: bool,
    pub(crate) hydrate: BTreeSet<String>,
    pub(crate) properties: Map<String, Value>,
    pub(crate) page_size: u64,
    pub(crate) start_index: u64,
}

impl Default for QueryDocument {
    fn default() -> Self {
        QueryDocument {
            find: Map::new(),
            sort: BTreeMap::new(),
            fields: BTreeSet::new(),
            fields_true: false,
            hydrate: BTreeSet::new(),
            properties: Map::new(),
            page_size: DEFAULT_PAGE_SIZE,
            start_index: 0,
        }
    }
}

impl Query for QueryDocument {
    fn document_mut(&mut self) -> &mut QueryDocument {
        self
    }
}

impl QueryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self) -> &Map<String, Value> {
        &self.find
    }

    pub fn sort(&self) -> &BTreeMap<String, SortDirection> {
        &self.sort
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn fields_true(&self) -> bool {
        self.fields_true
    }

    pub fn hydrate(&self) -> &BTreeSet<String> {
        &self.hydrate
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn start_index(&self) -> u64 {
        self.start_index
    }

    /// Checks the document can be executed.
    ///
    /// Projection conflicts are reported before a missing find clause.
    pub fn validate(&self) -> Result<(), Error> {
        if self.fields_true && !self.fields.is_empty() {
            return Err(Error::ConflictingProjection);
        }
        if self.find.is_empty() {
            return Err(Error::MissingFilter);
        }
        Ok(())
    }

    /// Builds the request object. Extra properties are merged last and
    /// override any named key they collide with.
    pub fn to_request_json(&self) -> Value {
        let mut request = Map::new();
        request.insert("find".to_string(), Value::Object(self.find.clone()));
        request.insert("start".to_string(), Value::from(self.start_index));
        request.insert("pagesize".to_string(), Value::from(self.page_size));
        if self.fields_true {
            request.insert("fields".to_string(), Value::Bool(true));
        } else if !self.fields.is_empty() {
            request.insert("fields".to_string(), string_array(&self.fields));
        }
        if !self.hydrate.is_empty() {
            request.insert("hydrate".to_string(), string_array(&self.hydrate));
        }
        if !self.sort.is_empty() {
            let sort = self
                .sort
                .iter()
                .map(|(field, direction)| (field.clone(), Value::from(direction.as_i32())))
                .collect();
            request.insert("sort".to_string(), Value::Object(sort));
        }

        for (name, value) in &self.properties {
            request.insert(name.clone(), value.clone());
        }

        Value::Object(request)
    }

    /// UTF-8 JSON body for the request.
    pub fn to_request_body(&self) -> Vec<u8> {
        self.to_request_json().to_string().into_bytes()
    }

    /// Copy of this document positioned at the following page.
    ///
    /// Advances by the requested page size, not by the number of records a
    /// page actually returned.
    pub fn next_page(&self) -> QueryDocument {
        let mut next = self.clone();
        next.start_index = self.start_index.saturating_add(self.page_size);
        next
    }
}

impl Serialize for QueryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_request_json().serialize(serializer)
    }
}

fn string_array(values: &BTreeSet<String>) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}
