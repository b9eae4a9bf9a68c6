//! Bolt protocol version definitions.

use std::fmt;

/// How a protocol version delivers query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolGeneration {
    /// The whole result set arrives in the response to a single PULL_ALL.
    Eager,
    /// Results are fetched in bounded pages via repeated PULL { n, qid }.
    Paginated,
}

impl ProtocolGeneration {
    /// Check if results must be pulled page by page.
    pub fn is_paginated(self) -> bool {
        self == ProtocolGeneration::Paginated
    }
}

/// Bolt protocol versions.
///
/// Version numbers are encoded as 4-byte big-endian integers:
/// - Major version in high 2 bytes
/// - Minor version in low 2 bytes
///
/// For example: V4_3 = 0x0004_0003 (major=4, minor=3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BoltVersion {
    /// Bolt 3 (Neo4j 3.5) - PULL_ALL / DISCARD_ALL only
    V3_0 = 0x0003_0000,
    /// Bolt 4.0 (Neo4j 4.0) - PULL { n, qid }, multiple databases
    V4_0 = 0x0004_0000,
    /// Bolt 4.1 (Neo4j 4.1)
    V4_1 = 0x0004_0001,
    /// Bolt 4.2 (Neo4j 4.2)
    V4_2 = 0x0004_0002,
    /// Bolt 4.3 (Neo4j 4.3) - Added ROUTE message
    V4_3 = 0x0004_0003,
    /// Bolt 4.4 (Neo4j 4.4)
    V4_4 = 0x0004_0004,
    /// Bolt 5.0 (Neo4j 5.0) - Element IDs, LOGON/LOGOFF
    V5_0 = 0x0005_0000,
}

impl BoltVersion {
    /// All known versions in order of preference (newest first).
    pub const ALL: [BoltVersion; 7] = [
        BoltVersion::V5_0,
        BoltVersion::V4_4,
        BoltVersion::V4_3,
        BoltVersion::V4_2,
        BoltVersion::V4_1,
        BoltVersion::V4_0,
        BoltVersion::V3_0,
    ];

    /// Create a BoltVersion from a raw u32 value.
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_u32() == value)
    }

    /// Get the raw u32 value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Get the major version number.
    pub fn major(self) -> u16 {
        ((self as u32) >> 16) as u16
    }

    /// Get the minor version number.
    pub fn minor(self) -> u16 {
        ((self as u32) & 0xFFFF) as u16
    }

    /// Parse from big-endian bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        Self::from_u32(u32::from_be_bytes(bytes))
    }

    /// Result delivery semantics of this version.
    pub fn generation(self) -> ProtocolGeneration {
        if self.major() < 4 {
            ProtocolGeneration::Eager
        } else {
            ProtocolGeneration::Paginated
        }
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl PartialOrd for BoltVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoltVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_u32().cmp(&other.as_u32())
    }
}
