use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{query::QueryDocument, Error};

/// A single snapshot record: field name to value, as returned by the service.
pub type Snapshot = Map<String, Value>;

/// One page of snapshots returned by the Lookback API.
///
/// Fields the service leaves out (or sends as `null`) keep their zero value.
/// Results are only handed to callers after [`LookbackResult::validate`]
/// has confirmed the service reported no errors.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct LookbackResult {
    /// Major version of the API that answered.
    #[serde(rename = "_rallyAPIMajor", deserialize_with = "null_as_default")]
    pub api_major: String,

    /// Minor version of the API that answered.
    #[serde(rename = "_rallyAPIMinor", deserialize_with = "null_as_default")]
    pub api_minor: String,

    /// Service-reported errors. Non-empty means the query failed.
    #[serde(rename = "Errors", deserialize_with = "null_as_default")]
    pub errors: Vec<String>,

    /// Non-fatal notes, e.g. a page size capped by the service.
    #[serde(rename = "Warnings", deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,

    /// Execution statistics reported by the service.
    #[serde(rename = "ThreadStats", deserialize_with = "null_as_default")]
    pub thread_stats: Map<String, Value>,

    /// Timing information about the query's execution.
    #[serde(rename = "Timings", deserialize_with = "null_as_default")]
    pub timings: Map<String, Value>,

    /// The query the service generated from the request document.
    #[serde(rename = "GeneratedQuery", deserialize_with = "null_as_default")]
    pub generated_query: Map<String, Value>,

    /// Number of snapshots matching the find clause across all pages.
    #[serde(rename = "TotalResultCount", deserialize_with = "null_as_default")]
    pub total_result_count: u64,

    /// Index of the first snapshot on this page.
    #[serde(rename = "StartIndex", deserialize_with = "null_as_default")]
    pub start_index: u64,

    /// Page size as echoed by the service.
    #[serde(rename = "PageSize", deserialize_with = "null_as_default")]
    pub page_size: u64,

    /// Timestamp of the data the query ran against, as sent.
    #[serde(rename = "ETLDate", deserialize_with = "null_as_default")]
    pub etl_date: String,

    /// The snapshots on this page.
    #[serde(rename = "Results", deserialize_with = "null_as_default")]
    pub results: Vec<Snapshot>,

    #[serde(skip)]
    source_query: Option<QueryDocument>,
}

impl LookbackResult {
    /// Fails with every service-reported error if there are any; otherwise
    /// records the query that produced this page.
    pub fn validate(mut self, query: QueryDocument) -> Result<Self, Error> {
        if !self.errors.is_empty() {
            return Err(Error::ServiceReportedError(self.errors));
        }
        self.source_query = Some(query);
        Ok(self)
    }

    /// Whether the service sent any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether snapshots remain beyond this page, judged from the records
    /// actually returned rather than the requested page size.
    pub fn has_more_pages(&self) -> bool {
        self.start_index.saturating_add(self.results.len() as u64) < self.total_result_count
    }

    /// Iterates the snapshots of this page in the order returned.
    pub fn records(&self) -> std::slice::Iter<'_, Snapshot> {
        self.results.iter()
    }

    /// The query that produced this page, when it came from an execution.
    pub fn source_query(&self) -> Option<&QueryDocument> {
        self.source_query.as_ref()
    }

    /// The ETL timestamp of the data, if the service sent a parseable one.
    pub fn etl_date(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.etl_date)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }
}

impl<'a> IntoIterator for &'a LookbackResult {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.records()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
