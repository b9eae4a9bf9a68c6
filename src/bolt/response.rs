//! Bolt protocol response messages.
//!
//! Response messages are sent from the server to the client. A PULL (or
//! PULL_ALL) is answered by zero or more RECORDs followed by exactly one
//! summary message.

use std::collections::HashMap;

use crate::driver::{BoltError, DriverError, DriverResult, Value};

/// A single data row, in column order.
pub type Row = Vec<Value>;

/// All Bolt response messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - Operation completed successfully
    Success(SuccessMessage),
    /// RECORD - Query result record
    Record(RecordMessage),
    /// FAILURE - Operation failed
    Failure(FailureMessage),
    /// IGNORED - Message was ignored (connection in FAILED state)
    Ignored,
}

impl BoltResponse {
    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }

    /// Shorthand for a RECORD response.
    pub fn record(fields: impl Into<Row>) -> Self {
        BoltResponse::Record(RecordMessage::new(fields.into()))
    }
}

/// One page of a PULL response, split into rows and trailing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PullPage {
    /// Data rows in server order
    pub rows: Vec<Row>,
    /// Summary sent after the last row of the page
    pub metadata: SuccessMessage,
}

impl PullPage {
    /// Interpret a PULL response.
    ///
    /// Every element but the last must be a RECORD; the last must be the
    /// summary. A trailing FAILURE surfaces as the server error it carries.
    pub fn from_responses(mut responses: Vec<BoltResponse>) -> DriverResult<Self> {
        let summary = responses
            .pop()
            .ok_or_else(|| DriverError::protocol("Empty response to PULL"))?;

        let metadata = match summary {
            BoltResponse::Success(success) => success,
            BoltResponse::Failure(failure) => return Err(failure.into_error().into()),
            BoltResponse::Ignored => {
                return Err(DriverError::protocol("PULL was ignored by the server"))
            }
            BoltResponse::Record(_) => {
                return Err(DriverError::protocol("PULL response is missing its summary"))
            }
        };

        let rows = responses
            .into_iter()
            .map(|response| match response {
                BoltResponse::Record(record) => Ok(record.fields),
                other => Err(DriverError::protocol(format!(
                    "Unexpected {} before the end of a PULL response",
                    other.name()
                ))),
            })
            .collect::<DriverResult<Vec<_>>>()?;

        Ok(Self { rows, metadata })
    }
}

/// SUCCESS message - Operation completed successfully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: HashMap<String, Value>,
}

impl SuccessMessage {
    /// Create a new SUCCESS message with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SUCCESS message with metadata.
    pub fn with_metadata(metadata: HashMap<String, Value>) -> Self {
        Self { metadata }
    }

    /// Add metadata entry.
    pub fn add(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Builder-style variant of [`SuccessMessage::add`].
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.add(key, value);
        self
    }

    /// Get metadata entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Check if the message carries no metadata at all.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Get server name.
    pub fn server(&self) -> Option<&str> {
        self.metadata.get("server").and_then(|v| v.as_str())
    }

    /// Get result available after (ms).
    pub fn result_available_after(&self) -> Option<i64> {
        self.metadata.get("t_first").and_then(|v| v.as_int())
    }

    /// Get result consumed after (ms).
    pub fn result_consumed_after(&self) -> Option<i64> {
        self.metadata.get("t_last").and_then(|v| v.as_int())
    }

    /// Get field names from RUN success.
    pub fn fields(&self) -> Option<Vec<String>> {
        self.metadata.get("fields").and_then(|v| {
            v.as_list().map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }

    /// Get query statistics.
    pub fn stats(&self) -> Option<&HashMap<String, Value>> {
        self.metadata.get("stats").and_then(|v| v.as_map())
    }

    /// Check if there are more results.
    ///
    /// An absent flag means the page was the last one.
    pub fn has_more(&self) -> bool {
        self.metadata
            .get("has_more")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Get bookmark.
    pub fn bookmark(&self) -> Option<&str> {
        self.metadata.get("bookmark").and_then(|v| v.as_str())
    }

    /// Get database name.
    pub fn db(&self) -> Option<&str> {
        self.metadata.get("db").and_then(|v| v.as_str())
    }

    /// Get query type ("r", "rw", "w" or "s").
    pub fn query_type(&self) -> Option<&str> {
        self.metadata.get("type").and_then(|v| v.as_str())
    }

    /// Get notifications list.
    pub fn notifications(&self) -> Option<&[Value]> {
        self.metadata.get("notifications").and_then(|v| v.as_list())
    }

    /// Get query ID.
    pub fn qid(&self) -> Option<i64> {
        self.metadata.get("qid").and_then(|v| v.as_int())
    }

    /// Create a PULL/DISCARD success response.
    pub fn streaming_success(has_more: bool, bookmark: Option<String>) -> Self {
        let mut msg = Self::new();
        if has_more {
            msg.add("has_more", true);
        }
        if let Some(bm) = bookmark {
            msg.add("bookmark", bm);
        }
        msg
    }
}

/// RECORD message - Query result record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMessage {
    /// Field values
    pub fields: Row,
}

impl RecordMessage {
    /// Create a new RECORD message.
    pub fn new(fields: Row) -> Self {
        Self { fields }
    }
}

/// FAILURE message - Operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    /// Neo4j error code
    pub code: String,
    /// Error message
    pub message: String,
}

impl FailureMessage {
    /// Create a new FAILURE message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Convert into the server error it describes.
    pub fn into_error(self) -> BoltError {
        BoltError::new(self.code, self.message)
    }
}
