//! Table definitions and the star-schema graph
//!
//! A [`TableDef`] is the single description of a warehouse table: its columns, its
//! natural/composite key and the tables it references. Adapters derive DDL and
//! conflict clauses from it; [`StarSchema`] derives load and reset order from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Result, StorageError};

/// Role of a table in the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Dimension,
    Bridge,
    Fact,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Dimension => "dimension",
            TableKind::Bridge => "bridge",
            TableKind::Fact => "fact",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// ISO-8601 `YYYY-MM-DD`
    Date,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl ColumnDef {
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// `FOREIGN KEY (columns) REFERENCES table(references)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: &'static [&'static str],
    pub table: &'static str,
    pub references: &'static [&'static str],
}

/// Static description of one warehouse table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub kind: TableKind,
    pub columns: &'static [ColumnDef],
    /// Natural (dimension) or composite (bridge/fact) key
    pub key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableDef {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn is_key(&self, column: &str) -> bool {
        self.key.contains(&column)
    }

    /// Non-key columns, overwritten on upsert
    pub fn measure_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .map(|c| c.name)
            .filter(|name| !self.is_key(name))
            .collect()
    }

    /// Names of the tables this table references (deduplicated, declaration order)
    pub fn references(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for fk in self.foreign_keys {
            if fk.table != self.name && !seen.contains(&fk.table) {
                seen.push(fk.table);
            }
        }
        seen
    }

    /// Structural checks: key and FK columns must exist
    pub fn check(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(StorageError::schema(format!(
                "Table {} declares no columns",
                self.name
            )));
        }
        let names: HashSet<&str> = self.columns.iter().map(|c| c.name).collect();
        if names.len() != self.columns.len() {
            return Err(StorageError::schema(format!(
                "Table {} declares a column twice",
                self.name
            )));
        }
        if self.key.is_empty() {
            return Err(StorageError::schema(format!(
                "Table {} declares no key",
                self.name
            )));
        }
        for column in self.key {
            if !names.contains(column) {
                return Err(StorageError::schema(format!(
                    "Key column {}.{} is not declared",
                    self.name, column
                )));
            }
        }
        for fk in self.foreign_keys {
            if fk.columns.len() != fk.references.len() {
                return Err(StorageError::schema(format!(
                    "Foreign key {}({}) -> {} has mismatched arity",
                    self.name,
                    fk.columns.join(", "),
                    fk.table
                )));
            }
            for column in fk.columns {
                if !names.contains(column) {
                    return Err(StorageError::schema(format!(
                        "Foreign key column {}.{} is not declared",
                        self.name, column
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for TableDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// A single bound value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(v) => Some(*v),
            ColumnValue::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Real(v) => Some(*v),
            ColumnValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => Ok(()),
            ColumnValue::Integer(v) => write!(f, "{}", v),
            ColumnValue::Real(v) => write!(f, "{}", v),
            ColumnValue::Text(v) => write!(f, "{}", v),
            ColumnValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Integer(v)
    }
}

impl From<u32> for ColumnValue {
    fn from(v: u32) -> Self {
        ColumnValue::Integer(i64::from(v))
    }
}

impl From<usize> for ColumnValue {
    fn from(v: usize) -> Self {
        ColumnValue::Integer(v as i64)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        ColumnValue::Real(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::Text(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for ColumnValue {
    fn from(v: NaiveDate) -> Self {
        ColumnValue::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}

/// A typed row bound to one table
pub trait TableRow {
    const TABLE: &'static TableDef;

    /// Values in `TABLE.columns` order
    fn values(&self) -> Vec<ColumnValue>;
}

/// Dependency graph of warehouse tables
///
/// Creation order puts every table after the tables it references; drop order is the
/// reverse, so deleting in drop order never violates a foreign key.
#[derive(Debug, Clone)]
pub struct StarSchema {
    name: &'static str,
    /// Creation order
    tables: Vec<&'static TableDef>,
}

impl StarSchema {
    pub fn new(name: &'static str, tables: Vec<&'static TableDef>) -> Result<Self> {
        let mut by_name: HashMap<&'static str, &'static TableDef> = HashMap::new();
        for table in &tables {
            table.check()?;
            if by_name.insert(table.name, table).is_some() {
                return Err(StorageError::schema(format!(
                    "Table {} registered twice in schema {}",
                    table.name, name
                )));
            }
        }

        // Validate references exist
        for table in &tables {
            for referenced in table.references() {
                if !by_name.contains_key(referenced) {
                    return Err(StorageError::schema(format!(
                        "Table {} references {} which is not part of schema {}",
                        table.name, referenced, name
                    )));
                }
            }
        }

        let ordered = Self::topological_sort(&tables)?;
        Ok(Self {
            name,
            tables: ordered,
        })
    }

    /// Kahn's algorithm; ties keep registration order so the result is deterministic
    fn topological_sort(tables: &[&'static TableDef]) -> Result<Vec<&'static TableDef>> {
        let mut in_degree: HashMap<&str, usize> = tables
            .iter()
            .map(|t| (t.name, t.references().len()))
            .collect();

        let mut result: Vec<&'static TableDef> = Vec::with_capacity(tables.len());
        let mut processed: HashSet<&str> = HashSet::new();

        while processed.len() < tables.len() {
            let ready: Vec<&'static TableDef> = tables
                .iter()
                .filter(|t| !processed.contains(t.name) && in_degree[t.name] == 0)
                .copied()
                .collect();

            if ready.is_empty() {
                let stuck: Vec<&str> = tables
                    .iter()
                    .map(|t| t.name)
                    .filter(|n| !processed.contains(n))
                    .collect();
                return Err(StorageError::schema(format!(
                    "Reference cycle between tables: {}",
                    stuck.join(", ")
                )));
            }

            for table in ready {
                processed.insert(table.name);
                result.push(table);

                for dependent in tables {
                    if dependent.references().contains(&table.name) {
                        if let Some(degree) = in_degree.get_mut(dependent.name) {
                            *degree -= 1;
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn creation_order(&self) -> &[&'static TableDef] {
        &self.tables
    }

    pub fn drop_order(&self) -> Vec<&'static TableDef> {
        self.tables.iter().rev().copied().collect()
    }

    pub fn get(&self, name: &str) -> Option<&'static TableDef> {
        self.tables.iter().find(|t| t.name == name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every table that directly or transitively references `table`, in drop order
    pub fn dependents_of(&self, table: &str) -> Vec<&'static TableDef> {
        let mut affected: HashSet<&str> = HashSet::new();
        affected.insert(table);

        // Creation order guarantees referenced tables are seen first
        for candidate in &self.tables {
            if candidate.references().iter().any(|r| affected.contains(r)) {
                affected.insert(candidate.name);
            }
        }

        self.drop_order()
            .into_iter()
            .filter(|t| t.name != table && affected.contains(t.name))
            .collect()
    }

    /// Load plan as string (for logging)
    pub fn load_plan(&self) -> String {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {} [{}]", i + 1, t.name, t.kind))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: TableDef = TableDef {
        name: "dim_parent",
        kind: TableKind::Dimension,
        columns: &[ColumnDef::required("id", ColumnType::Integer)],
        key: &["id"],
        foreign_keys: &[],
    };

    const OTHER: TableDef = TableDef {
        name: "dim_other",
        kind: TableKind::Dimension,
        columns: &[ColumnDef::required("id", ColumnType::Integer)],
        key: &["id"],
        foreign_keys: &[],
    };

    const LINK: TableDef = TableDef {
        name: "parent_other",
        kind: TableKind::Bridge,
        columns: &[
            ColumnDef::required("parent_id", ColumnType::Integer),
            ColumnDef::required("other_id", ColumnType::Integer),
        ],
        key: &["parent_id", "other_id"],
        foreign_keys: &[
            ForeignKey {
                columns: &["parent_id"],
                table: "dim_parent",
                references: &["id"],
            },
            ForeignKey {
                columns: &["other_id"],
                table: "dim_other",
                references: &["id"],
            },
        ],
    };

    const FACT: TableDef = TableDef {
        name: "fact_things",
        kind: TableKind::Fact,
        columns: &[
            ColumnDef::required("parent_id", ColumnType::Integer),
            ColumnDef::optional("score", ColumnType::Real),
        ],
        key: &["parent_id"],
        foreign_keys: &[ForeignKey {
            columns: &["parent_id"],
            table: "dim_parent",
            references: &["id"],
        }],
    };

    const CYCLE_A: TableDef = TableDef {
        name: "a",
        kind: TableKind::Dimension,
        columns: &[ColumnDef::required("id", ColumnType::Integer)],
        key: &["id"],
        foreign_keys: &[ForeignKey {
            columns: &["id"],
            table: "b",
            references: &["id"],
        }],
    };

    const CYCLE_B: TableDef = TableDef {
        name: "b",
        kind: TableKind::Dimension,
        columns: &[ColumnDef::required("id", ColumnType::Integer)],
        key: &["id"],
        foreign_keys: &[ForeignKey {
            columns: &["id"],
            table: "a",
            references: &["id"],
        }],
    };

    fn names(tables: &[&'static TableDef]) -> Vec<&'static str> {
        tables.iter().map(|t| t.name).collect()
    }

    #[test]
    fn test_creation_order_puts_dimensions_first() {
        // Registered fact-first on purpose
        let schema = StarSchema::new("test", vec![&FACT, &LINK, &PARENT, &OTHER]).unwrap();
        let order = names(schema.creation_order());

        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert!(pos("dim_parent") < pos("parent_other"));
        assert!(pos("dim_other") < pos("parent_other"));
        assert!(pos("dim_parent") < pos("fact_things"));
    }

    #[test]
    fn test_drop_order_is_reverse_of_creation() {
        let schema = StarSchema::new("test", vec![&PARENT, &OTHER, &LINK, &FACT]).unwrap();
        let mut creation = names(schema.creation_order());
        creation.reverse();
        assert_eq!(names(&schema.drop_order()), creation);
    }

    #[test]
    fn test_dependents_of_dimension() {
        let schema = StarSchema::new("test", vec![&PARENT, &OTHER, &LINK, &FACT]).unwrap();

        let deps = names(&schema.dependents_of("dim_parent"));
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&"parent_other"));
        assert!(deps.contains(&"fact_things"));

        let deps = names(&schema.dependents_of("dim_other"));
        assert_eq!(deps, vec!["parent_other"]);

        assert!(schema.dependents_of("fact_things").is_empty());
    }

    #[test]
    fn test_missing_reference_rejected() {
        let err = StarSchema::new("test", vec![&LINK, &PARENT]).unwrap_err();
        assert!(err.message.contains("dim_other"));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = StarSchema::new("test", vec![&CYCLE_A, &CYCLE_B]).unwrap_err();
        assert!(err.message.contains("cycle"));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        assert!(StarSchema::new("test", vec![&PARENT, &PARENT]).is_err());
    }

    #[test]
    fn test_measure_columns_exclude_key() {
        assert_eq!(FACT.measure_columns(), vec!["score"]);
        assert!(LINK.measure_columns().is_empty());
    }

    #[test]
    fn test_check_rejects_unknown_key_column() {
        const BAD: TableDef = TableDef {
            name: "bad",
            kind: TableKind::Dimension,
            columns: &[ColumnDef::required("id", ColumnType::Integer)],
            key: &["missing"],
            foreign_keys: &[],
        };
        assert!(BAD.check().is_err());
    }

    #[test]
    fn test_column_value_conversions() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 17).unwrap();
        assert_eq!(ColumnValue::from(date), ColumnValue::Text("2025-11-17".into()));
        assert_eq!(ColumnValue::from(None::<i64>), ColumnValue::Null);
        assert_eq!(ColumnValue::from(Some(3i64)).as_i64(), Some(3));
        assert_eq!(ColumnValue::Integer(2).as_f64(), Some(2.0));
        assert_eq!(ColumnValue::from(date).as_date(), Some(date));
    }
}
