//! Column type mapping.
//!
//! Postgres reports every result column with a numeric type OID. This module
//! maps those identifiers onto the portable [`ColumnType`] tags carried by a
//! [`ResultSet`](crate::models::ResultSet).

use serde::{Deserialize, Serialize};

// =============================================================================
// Type OIDs
// =============================================================================

/// Built-in Postgres type OIDs (see `pg_type.dat`).
pub mod oid {
    pub const BOOL: u32 = 16;
    pub const BYTEA: u32 = 17;
    pub const CHAR: u32 = 18;
    pub const NAME: u32 = 19;
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT4: u32 = 23;
    pub const TEXT: u32 = 25;
    pub const OID: u32 = 26;
    pub const JSON: u32 = 114;
    pub const XML: u32 = 142;
    pub const XML_ARRAY: u32 = 143;
    pub const JSON_ARRAY: u32 = 199;
    pub const CIDR: u32 = 650;
    pub const CIDR_ARRAY: u32 = 651;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
    pub const MONEY: u32 = 790;
    pub const MONEY_ARRAY: u32 = 791;
    pub const MACADDR: u32 = 829;
    pub const INET: u32 = 869;
    pub const BOOL_ARRAY: u32 = 1000;
    pub const BYTEA_ARRAY: u32 = 1001;
    pub const CHAR_ARRAY: u32 = 1002;
    pub const NAME_ARRAY: u32 = 1003;
    pub const INT2_ARRAY: u32 = 1005;
    pub const INT4_ARRAY: u32 = 1007;
    pub const TEXT_ARRAY: u32 = 1009;
    pub const BPCHAR_ARRAY: u32 = 1014;
    pub const VARCHAR_ARRAY: u32 = 1015;
    pub const INT8_ARRAY: u32 = 1016;
    pub const FLOAT4_ARRAY: u32 = 1021;
    pub const FLOAT8_ARRAY: u32 = 1022;
    pub const OID_ARRAY: u32 = 1028;
    pub const MACADDR_ARRAY: u32 = 1040;
    pub const INET_ARRAY: u32 = 1041;
    pub const BPCHAR: u32 = 1042;
    pub const VARCHAR: u32 = 1043;
    pub const DATE: u32 = 1082;
    pub const TIME: u32 = 1083;
    pub const TIMESTAMP: u32 = 1114;
    pub const TIMESTAMP_ARRAY: u32 = 1115;
    pub const DATE_ARRAY: u32 = 1182;
    pub const TIME_ARRAY: u32 = 1183;
    pub const TIMESTAMPTZ: u32 = 1184;
    pub const TIMESTAMPTZ_ARRAY: u32 = 1185;
    pub const INTERVAL: u32 = 1186;
    pub const INTERVAL_ARRAY: u32 = 1187;
    pub const NUMERIC_ARRAY: u32 = 1231;
    pub const TIMETZ: u32 = 1266;
    pub const TIMETZ_ARRAY: u32 = 1270;
    pub const BIT: u32 = 1560;
    pub const BIT_ARRAY: u32 = 1561;
    pub const VARBIT: u32 = 1562;
    pub const VARBIT_ARRAY: u32 = 1563;
    pub const NUMERIC: u32 = 1700;
    pub const UUID: u32 = 2950;
    pub const UUID_ARRAY: u32 = 2951;
    pub const JSONB: u32 = 3802;
    pub const JSONB_ARRAY: u32 = 3807;

    /// Ids at or above this value are treated as user-defined types.
    pub const FIRST_CUSTOM_TYPE: u32 = 10_000;
}

// =============================================================================
// Column Types
// =============================================================================

/// Portable column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Int32,
    Int64,
    Float,
    Double,
    Numeric,
    Boolean,
    Char,
    Text,
    Date,
    Time,
    DateTime,
    Json,
    Enum,
    Bytes,
    Uuid,
    Int32Array,
    Int64Array,
    FloatArray,
    DoubleArray,
    NumericArray,
    BooleanArray,
    CharArray,
    TextArray,
    DateArray,
    TimeArray,
    DateTimeArray,
    JsonArray,
    BytesArray,
    UuidArray,
    /// Fallback for identifiers with no mapping.
    Unknown,
}

impl ColumnType {
    /// Check if this tag describes an array column.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::Int32Array
                | Self::Int64Array
                | Self::FloatArray
                | Self::DoubleArray
                | Self::NumericArray
                | Self::BooleanArray
                | Self::CharArray
                | Self::TextArray
                | Self::DateArray
                | Self::TimeArray
                | Self::DateTimeArray
                | Self::JsonArray
                | Self::BytesArray
                | Self::UuidArray
        )
    }
}

/// Map a Postgres type OID to its column type. Never fails: unmapped
/// built-in ids resolve to [`ColumnType::Unknown`], custom types to
/// [`ColumnType::Enum`].
pub fn map_column_type(native_type_id: u32) -> ColumnType {
    use oid::*;

    match native_type_id {
        INT2 | INT4 => ColumnType::Int32,
        INT8 | OID => ColumnType::Int64,
        FLOAT4 => ColumnType::Float,
        FLOAT8 => ColumnType::Double,
        NUMERIC | MONEY => ColumnType::Numeric,
        BOOL => ColumnType::Boolean,
        CHAR => ColumnType::Char,
        TEXT | VARCHAR | BPCHAR | NAME | XML | INET | CIDR | MACADDR | INTERVAL | BIT
        | VARBIT => ColumnType::Text,
        DATE => ColumnType::Date,
        TIME | TIMETZ => ColumnType::Time,
        TIMESTAMP | TIMESTAMPTZ => ColumnType::DateTime,
        JSON | JSONB => ColumnType::Json,
        BYTEA => ColumnType::Bytes,
        UUID => ColumnType::Uuid,

        INT2_ARRAY | INT4_ARRAY => ColumnType::Int32Array,
        INT8_ARRAY | OID_ARRAY => ColumnType::Int64Array,
        FLOAT4_ARRAY => ColumnType::FloatArray,
        FLOAT8_ARRAY => ColumnType::DoubleArray,
        NUMERIC_ARRAY | MONEY_ARRAY => ColumnType::NumericArray,
        BOOL_ARRAY => ColumnType::BooleanArray,
        CHAR_ARRAY => ColumnType::CharArray,
        TEXT_ARRAY | VARCHAR_ARRAY | BPCHAR_ARRAY | NAME_ARRAY | XML_ARRAY | INET_ARRAY
        | CIDR_ARRAY | MACADDR_ARRAY | INTERVAL_ARRAY | BIT_ARRAY | VARBIT_ARRAY => {
            ColumnType::TextArray
        }
        DATE_ARRAY => ColumnType::DateArray,
        TIME_ARRAY | TIMETZ_ARRAY => ColumnType::TimeArray,
        TIMESTAMP_ARRAY | TIMESTAMPTZ_ARRAY => ColumnType::DateTimeArray,
        JSON_ARRAY | JSONB_ARRAY => ColumnType::JsonArray,
        BYTEA_ARRAY => ColumnType::BytesArray,
        UUID_ARRAY => ColumnType::UuidArray,

        id if id >= FIRST_CUSTOM_TYPE => ColumnType::Enum,
        _ => ColumnType::Unknown,
    }
}
