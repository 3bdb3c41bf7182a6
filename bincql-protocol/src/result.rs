//! Typed RESULT frame decoding: result-kind dispatch, row metadata and
//! row content.

use crate::codec::Cursor;
use crate::error::ProtocolError;
use crate::value::{decode_value, ColumnType, ColumnValue};

/// Result kind codes, read as the first int of a RESULT body.
mod kind {
    pub const VOID: i32 = 0x0001;
    pub const ROWS: i32 = 0x0002;
    pub const SET_KEYSPACE: i32 = 0x0003;
    pub const PREPARED: i32 = 0x0004;
    pub const SCHEMA_CHANGE: i32 = 0x0005;
}

/// Row metadata flag: keyspace and table names are given once for all
/// columns instead of repeated per column.
pub const METADATA_FLAG_GLOBAL_TABLES_SPEC: i32 = 0x0001;

/// A keyspace/table name pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub keyspace: String,
    pub table: String,
}

/// One column descriptor from row metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
}

/// The metadata block preceding row content in a ROWS result.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMetadata {
    pub flags: i32,
    pub column_count: i32,
    /// Present iff the global-tables-spec flag is set.
    pub global_table_spec: Option<TableSpec>,
    /// Ordered to match cell positions within each row.
    pub columns: Vec<ColumnSpec>,
}

impl RowMetadata {
    /// Parses `<flags><columns_count><global_table_spec>?<col_spec>...`.
    ///
    /// When the global flag is clear and columns exist, a single
    /// keyspace/table pair sits before the column list, not one per
    /// column; it is consumed and dropped.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let flags = cur.read_i32()?;
        let column_count = cur.read_i32()?;
        let global = flags & METADATA_FLAG_GLOBAL_TABLES_SPEC != 0;

        let global_table_spec = if global {
            Some(TableSpec {
                keyspace: cur.read_string()?,
                table: cur.read_string()?,
            })
        } else {
            None
        };

        let mut columns = Vec::new();
        if column_count > 0 {
            if !global {
                let _keyspace = cur.read_string()?;
                let _table = cur.read_string()?;
            }
            columns.reserve(column_count as usize);
            for _ in 0..column_count {
                let name = cur.read_string()?;
                let ty = ColumnType::decode(cur)?;
                columns.push(ColumnSpec { name, ty });
            }
        }

        Ok(Self {
            flags,
            column_count,
            global_table_spec,
            columns,
        })
    }
}

/// One decoded row: column name/value pairs in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<(String, ColumnValue)>,
}

impl Row {
    /// Looks a cell up by column name.
    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.cells
            .iter()
            .find(|(cell_name, _)| cell_name == name)
            .map(|(_, value)| value)
    }
}

/// A decoded RESULT frame body.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Void,
    Rows {
        metadata: RowMetadata,
        rows: Vec<Row>,
    },
    SetKeyspace(String),
    SchemaChange {
        change_type: String,
        keyspace: String,
        table: String,
    },
    Prepared {
        query_id: Vec<u8>,
        metadata: RowMetadata,
    },
    /// A result kind this implementation does not recognize; surfaced
    /// explicitly instead of failing the decode.
    Unknown { kind: i32 },
}

impl QueryResult {
    /// Decodes a RESULT body, dispatching on the leading result kind.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let result_kind = cur.read_i32()?;
        match result_kind {
            kind::VOID => Ok(QueryResult::Void),
            kind::ROWS => {
                let metadata = RowMetadata::decode(cur)?;
                let row_count = cur.read_i32()?;
                let mut rows = Vec::with_capacity(row_count.max(0) as usize);
                for _ in 0..row_count {
                    rows.push(decode_row(cur, &metadata)?);
                }
                Ok(QueryResult::Rows { metadata, rows })
            }
            kind::SET_KEYSPACE => Ok(QueryResult::SetKeyspace(cur.read_string()?)),
            kind::PREPARED => {
                let _ = cur.read_i32()?;
                let query_id = cur.read_short_bytes()?.to_vec();
                let metadata = RowMetadata::decode(cur)?;
                Ok(QueryResult::Prepared { query_id, metadata })
            }
            kind::SCHEMA_CHANGE => Ok(QueryResult::SchemaChange {
                change_type: cur.read_string()?,
                keyspace: cur.read_string()?,
                table: cur.read_string()?,
            }),
            other => Ok(QueryResult::Unknown { kind: other }),
        }
    }
}

fn decode_row(cur: &mut Cursor<'_>, metadata: &RowMetadata) -> Result<Row, ProtocolError> {
    let mut cells = Vec::with_capacity(metadata.columns.len());
    for spec in &metadata.columns {
        let value = decode_value(cur, &spec.ty)?;
        cells.push((spec.name.clone(), value));
    }
    Ok(Row { cells })
}
