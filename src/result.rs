use std::fmt;

use serde::Deserialize;

use crate::cells::{Cell, RawCell};

pub type StringTable = Vec<Vec<Option<String>>>;

/// Column metadata as declared by the result's `rowtype`
///
/// Only `name` and `type` are guaranteed; the rest depends on the statement
/// (SHOW and DESCRIBE output carries very little).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: RawCell,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub table: String,
    pub precision: Option<u32>,
    pub scale: Option<i32>,
    pub byte_length: Option<usize>,
    #[serde(default = "nullable_default")]
    pub nullable: bool,
}

fn nullable_default() -> bool {
    true
}

impl Column {
    /// A bare column, mostly useful for building results by hand
    pub fn new(name: &str, data_type: RawCell) -> Column {
        Column {
            name: name.to_owned(),
            data_type,
            database: String::new(),
            schema: String::new(),
            table: String::new(),
            precision: None,
            scale: None,
            byte_length: None,
            nullable: true,
        }
    }
}

/// All rows of one statement, in the order the service returned them
///
/// Values are kept as the raw strings from the wire so nothing is coerced
/// until a caller asks for [`Cell`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: StringTable,
}

impl ResultSet {
    pub fn new(columns: Vec<Column>, rows: StringTable) -> ResultSet {
        ResultSet { columns, rows }
    }

    /// The empty result handed back for failed statements
    pub fn empty() -> ResultSet {
        ResultSet::default()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column by name, ignoring case
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn first(&self) -> Option<Row<'_>> {
        self.row(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// First row with any value containing `needle`, ignoring case
    pub fn find_row(&self, needle: &str) -> Option<Row<'_>> {
        let needle = needle.to_lowercase();
        self.iter().find(|row| {
            row.values
                .iter()
                .flatten()
                .any(|value| value.to_lowercase().contains(&needle))
        })
    }

    /// First row whose `column` equals `key`, ignoring case and surrounding whitespace
    pub fn find_by(&self, column: &str, key: &str) -> Option<Row<'_>> {
        let index = self.column_index(column)?;
        self.iter().find(|row| {
            row.values
                .get(index)
                .and_then(|v| v.as_deref())
                .map_or(false, |v| v.trim().eq_ignore_ascii_case(key.trim()))
        })
    }

    /// Convert the rows into `Cell`s in a list of lists format
    pub fn cells(&self) -> Vec<Vec<Cell>> {
        self.iter().map(|row| row.cells()).collect()
    }

    /// Convert the rows into `serde_json::Value`s in a list of lists format
    pub fn json_table(&self) -> Vec<Vec<serde_json::Value>> {
        self.cells()
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.into()).collect())
            .collect()
    }

    /// Convert the rows into `serde_json::Value`s in a list of objects format
    pub fn json_objects(&self) -> Vec<serde_json::Value> {
        self.json_table()
            .into_iter()
            .map(|row| {
                serde_json::Value::Object(
                    row.into_iter()
                        .enumerate()
                        .map(|(i, cell)| (self.columns[i].name.clone(), cell))
                        .collect(),
                )
            })
            .collect()
    }
}

/// Renders like a list of tuples: `[(5,), ('Hot Option', 21)]`
impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, row) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{row}")?;
        }
        f.write_str("]")
    }
}

/// A borrowed view of one row with access by column name
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [Column],
    values: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Raw value of the named column; `None` for unknown columns and SQL NULL alike
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))?;
        self.get_index(index)
    }

    pub fn get_index(&self, index: usize) -> Option<&'a str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Typed value of the named column
    pub fn cell(&self, name: &str) -> Option<Cell> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))?;
        let value = self.values.get(index)?;
        Some(self.columns[index].data_type.to_cell(value))
    }

    pub fn cells(&self) -> Vec<Cell> {
        self.values
            .iter()
            .zip(self.columns)
            .map(|(value, column)| column.data_type.to_cell(value))
            .collect()
    }

    pub fn values(&self) -> &'a [Option<String>] {
        self.values
    }
}

impl fmt::Display for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = self.cells();
        f.write_str("(")?;
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{cell}")?;
        }
        if cells.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}
