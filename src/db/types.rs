/// A value that can be stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbValue {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// Unsigned 64-bit integer (stored as BIGINT)
    Uint64(u64),
    /// Text (unlimited length)
    Text(String),
    /// Raw bytes (stored as BYTEA)
    Bytes(Vec<u8>),
    /// Ethereum address (20 bytes, stored as BYTEA)
    Address([u8; 20]),
    /// 32-byte hash (stored as BYTEA)
    Bytes32([u8; 32]),
    /// Arbitrary precision integer as a decimal string (stored as NUMERIC)
    Numeric(String),
    /// Unix timestamp in seconds (stored as TIMESTAMPTZ)
    Timestamp(u64),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// `Address` when present, `Null` otherwise.
    pub fn optional_address(value: Option<[u8; 20]>) -> Self {
        value.map_or(DbValue::Null, DbValue::Address)
    }

    pub fn optional_bytes32(value: Option<[u8; 32]>) -> Self {
        value.map_or(DbValue::Null, DbValue::Bytes32)
    }
}

/// Database operation executed as part of a transaction.
#[derive(Debug, Clone)]
pub enum DbOperation {
    /// INSERT with ON CONFLICT DO UPDATE (upsert)
    Upsert {
        table: String,
        columns: Vec<String>,
        values: Vec<DbValue>,
        /// Columns that form the unique constraint
        conflict_columns: Vec<String>,
        /// Columns overwritten on conflict
        update_columns: Vec<String>,
    },
    /// INSERT with ON CONFLICT adding the new values into the stored ones
    Accumulate {
        table: String,
        columns: Vec<String>,
        values: Vec<DbValue>,
        conflict_columns: Vec<String>,
        /// Numeric columns summed on conflict
        accumulate_columns: Vec<String>,
    },
    /// Simple INSERT, fails on conflict
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<DbValue>,
    },
    /// Raw SQL for anything else (use sparingly)
    RawSql {
        query: String,
        params: Vec<DbValue>,
    },
}
