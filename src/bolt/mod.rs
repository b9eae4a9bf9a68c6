//! # Bolt Protocol Types
//!
//! Protocol-level pieces the result layer needs from Bolt:
//!
//! - [`version`] - Protocol versions and their result delivery generation
//! - [`response`] - Server responses to PULL and DISCARD
//!
//! Message encoding (PackStream, chunking) belongs to the transport behind
//! [`crate::driver::Connection`] and is not part of this crate.

pub mod response;
pub mod version;

pub use response::{
    BoltResponse, FailureMessage, PullPage, RecordMessage, Row, SuccessMessage,
};
pub use version::{BoltVersion, ProtocolGeneration};
