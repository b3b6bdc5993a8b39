use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EtlError, EtlResult};

mod loader;
pub mod sql;

pub use loader::{Loader, RowCounts};

/// Owns the single connection used for a whole run.
///
/// The connection is closed explicitly by [`Database::close`] on the success
/// path; on every other path dropping the `Database` drops the connection,
/// which rolls back any open transaction and closes the handle.
pub struct Database {
    conn: Connection,
    location: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> EtlResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EtlError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        info!("Connected to database {}", path.display());
        Ok(Self {
            conn,
            location: path.to_path_buf(),
        })
    }

    /// Private database with the star schema already created.
    #[cfg(test)]
    pub fn open_in_memory() -> EtlResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            location: PathBuf::from(":memory:"),
        };
        db.create_schema()?;
        Ok(db)
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the fact and dimension tables if they are missing.
    pub fn create_schema(&self) -> EtlResult<()> {
        let conn = self.connection();
        for (table, query) in sql::TABLES.iter().zip(sql::CREATE_TABLE_QUERIES) {
            conn.execute(query, [])?;
            debug!("Ensured table {}", table);
        }
        Ok(())
    }

    /// Starts the transaction that scopes one input file.
    pub fn begin(&mut self) -> EtlResult<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    pub fn count_rows(&self, table: &str) -> EtlResult<usize> {
        let count: i64 = self.connection().query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\"")),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Row counts currently stored in every star schema table.
    pub fn table_counts(&self) -> EtlResult<RowCounts> {
        Ok(RowCounts {
            songs: self.count_rows("songs")?,
            artists: self.count_rows("artists")?,
            time: self.count_rows("time")?,
            users: self.count_rows("users")?,
            songplays: self.count_rows("songplays")?,
        })
    }

    pub fn close(self) -> EtlResult<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        info!("Closed database {}", self.location.display());
        Ok(())
    }
}
