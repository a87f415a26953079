//! Table schema declarations and dialect-specific DDL.
//!
//! Each entity table declares its columns once as a [`TableSchema`].
//! [`ensure_table`] creates the table if it is missing and then adds any
//! column introduced after the table was first created. Migration is
//! additive only: nothing is dropped or rewritten.

use plan_core::errors::StorageError;
use plan_core::Dialect;

use crate::connection::Connection;
use crate::sql_params;

/// Schema version written after a successful setup.
pub const LATEST_SCHEMA_VERSION: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Auto-increment integer primary key.
    Id,
    Int,
    BigInt,
    Double,
    Bool,
    /// Length-bounded string. Unbounded `TEXT` on SQLite.
    Varchar(u16),
}

impl ColumnKind {
    pub fn render(self, dialect: Dialect) -> String {
        match (self, dialect) {
            (Self::Id, Dialect::Sqlite) => "INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            (Self::Id, Dialect::MySql) => "INT NOT NULL AUTO_INCREMENT PRIMARY KEY".to_string(),
            (Self::Int, Dialect::Sqlite) => "INTEGER".to_string(),
            (Self::Int, Dialect::MySql) => "INT".to_string(),
            (Self::BigInt, _) => "BIGINT".to_string(),
            (Self::Double, Dialect::Sqlite) => "REAL".to_string(),
            (Self::Double, Dialect::MySql) => "DOUBLE".to_string(),
            (Self::Bool, _) => "BOOLEAN".to_string(),
            (Self::Varchar(_), Dialect::Sqlite) => "TEXT".to_string(),
            (Self::Varchar(len), Dialect::MySql) => format!("VARCHAR({len})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub default: Option<&'static str>,
    pub unique: bool,
    /// Schema version that introduced the column.
    pub since: u32,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            default: None,
            unique: false,
            since: 1,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn since(mut self, version: u32) -> Self {
        self.since = version;
        self
    }

    /// Whether the column can be added to a populated table.
    pub fn is_additive(&self) -> bool {
        self.kind != ColumnKind::Id && !self.unique && (self.nullable || self.default.is_some())
    }

    pub fn definition(&self, dialect: Dialect) -> String {
        let mut def = format!("{} {}", self.name, self.kind.render(dialect));
        if self.kind == ColumnKind::Id {
            return def;
        }
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        def
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn create_sql(&self, dialect: Dialect) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| c.definition(dialect))
            .collect::<Vec<_>>()
            .join(", ");
        let suffix = match dialect {
            Dialect::Sqlite => "",
            Dialect::MySql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        };
        format!("CREATE TABLE IF NOT EXISTS {} ({columns}){suffix}", self.name)
    }

    pub fn add_column_sql(&self, column: &Column, dialect: Dialect) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.name,
            column.definition(dialect)
        )
    }

    /// Columns added after the first version, in declaration order.
    pub fn later_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.since > 1)
    }
}

pub fn table_exists(
    conn: &mut dyn Connection,
    dialect: Dialect,
    table: &str,
) -> Result<bool, StorageError> {
    let sql = match dialect {
        Dialect::Sqlite => "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
        Dialect::MySql => {
            "SELECT 1 FROM information_schema.TABLES
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?"
        }
    };
    conn.exists(sql, &sql_params![table])
}

pub fn column_exists(
    conn: &mut dyn Connection,
    dialect: Dialect,
    table: &str,
    column: &str,
) -> Result<bool, StorageError> {
    let sql = match dialect {
        Dialect::Sqlite => "SELECT 1 FROM pragma_table_info(?) WHERE name = ?",
        Dialect::MySql => {
            "SELECT 1 FROM information_schema.COLUMNS
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ?"
        }
    };
    conn.exists(sql, &sql_params![table, column])
}

/// Create `schema` if missing, then add any later column it lacks.
/// Safe to call repeatedly. Returns the names of the columns added.
pub fn ensure_table(
    conn: &mut dyn Connection,
    dialect: Dialect,
    schema: &TableSchema,
) -> Result<Vec<&'static str>, StorageError> {
    conn.execute(&schema.create_sql(dialect), &[])?;

    let mut added = Vec::new();
    for column in schema.later_columns() {
        if column_exists(conn, dialect, schema.name, column.name)? {
            continue;
        }
        if !column.is_additive() {
            return Err(StorageError::MigrationFailed {
                version: column.since,
                message: format!(
                    "column {}.{} cannot be added to an existing table",
                    schema.name, column.name
                ),
            });
        }
        conn.execute(&schema.add_column_sql(column, dialect), &[])?;
        tracing::debug!(table = schema.name, column = column.name, "added column");
        added.push(column.name);
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::sqlite::SqliteDataSource;
    use crate::connection::DataSource;

    const COLUMNS: &[Column] = &[
        Column::new("id", ColumnKind::Id),
        Column::new("name", ColumnKind::Varchar(16)).unique(),
        Column::new("score", ColumnKind::Double).nullable(),
        Column::new("kicks", ColumnKind::Int).default_value("0").since(6),
    ];
    const SAMPLE: TableSchema = TableSchema {
        name: "sample",
        columns: COLUMNS,
    };

    #[test]
    fn renders_dialect_types() {
        assert_eq!(
            SAMPLE.create_sql(Dialect::Sqlite),
            "CREATE TABLE IF NOT EXISTS sample (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             name TEXT NOT NULL UNIQUE, score REAL, kicks INTEGER NOT NULL DEFAULT 0)"
        );
        assert_eq!(
            SAMPLE.create_sql(Dialect::MySql),
            "CREATE TABLE IF NOT EXISTS sample (id INT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
             name VARCHAR(16) NOT NULL UNIQUE, score DOUBLE, kicks INT NOT NULL DEFAULT 0) \
             ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let source = SqliteDataSource::open_in_memory().unwrap();
        let mut conn = source.get_connection().unwrap();

        assert!(!table_exists(conn.as_mut(), Dialect::Sqlite, "sample").unwrap());
        assert!(ensure_table(conn.as_mut(), Dialect::Sqlite, &SAMPLE).unwrap().is_empty());
        assert!(ensure_table(conn.as_mut(), Dialect::Sqlite, &SAMPLE).unwrap().is_empty());
        assert!(table_exists(conn.as_mut(), Dialect::Sqlite, "sample").unwrap());

        let tables = conn
            .query("SELECT name FROM sqlite_master WHERE name = 'sample'", &[])
            .unwrap();
        assert_eq!(tables.len(), 1);
        conn.close().unwrap();
    }

    #[test]
    fn ensure_table_adds_missing_column_and_keeps_rows() {
        let source = SqliteDataSource::open_in_memory().unwrap();
        let mut conn = source.get_connection().unwrap();
        conn.execute(
            "CREATE TABLE sample (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, score REAL)",
            &[],
        )
        .unwrap();
        conn.execute("INSERT INTO sample (name, score) VALUES ('a', 1.0)", &[])
            .unwrap();

        let added = ensure_table(conn.as_mut(), Dialect::Sqlite, &SAMPLE).unwrap();
        assert_eq!(added, vec!["kicks"]);
        assert!(column_exists(conn.as_mut(), Dialect::Sqlite, "sample", "kicks").unwrap());

        let row = conn
            .query_row("SELECT name, kicks FROM sample", &[])
            .unwrap()
            .unwrap();
        assert_eq!(row.get_string(0).unwrap(), "a");
        assert_eq!(row.get_i64(1).unwrap(), 0);
        conn.close().unwrap();
    }

    #[test]
    fn unique_or_required_columns_are_not_additive() {
        assert!(!Column::new("a", ColumnKind::Int).since(2).is_additive());
        assert!(!Column::new("a", ColumnKind::Int).nullable().unique().is_additive());
        assert!(Column::new("a", ColumnKind::Int).nullable().is_additive());
    }
}
