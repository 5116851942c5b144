//! A read-only query engine over SQLite database files.
//!
//! The engine opens an existing database, interprets the schema table on
//! page 1, decodes b-tree pages on demand, and evaluates a small SELECT
//! subset: `COUNT(*)`, column projection, and equality WHERE filters,
//! using a matching index b-tree to resolve the filter when one exists.
//!
//! ```no_run
//! let db = roqlite::Database::open("sample.db").unwrap();
//! for line in db.query("SELECT name FROM apples WHERE color = 'Red'").unwrap() {
//!     println!("{}", line);
//! }
//! ```

pub mod ast;
pub mod btree;
pub mod dbheader;
pub mod eval;
pub mod pager;
pub mod parser;
pub mod pt_to_ast;
pub mod record;
pub mod schema;
pub mod serial_type;
pub mod sql_value;
pub mod varint;

use pager::Pager;
use schema::Catalog;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("opening database: {0}")]
    Open(#[from] pager::Error),
    #[error("loading schema: {0}")]
    Schema(#[from] schema::Error),
    #[error(transparent)]
    Query(#[from] eval::Error),
}

/// One open database file: the pager that owns the file handle plus the
/// catalog built from the schema table at open time.
///
/// Access is single-threaded and synchronous; callers wanting concurrency
/// must serialize externally.
pub struct Database {
    pager: Pager,
    catalog: Catalog,
}

impl Database {
    /// Opens a database file, validates its header and loads the catalog.
    pub fn open(path: &str) -> Result<Database, Error> {
        let pager = Pager::open(path)?;
        let catalog = Catalog::load(&pager)?;
        Ok(Database { pager, catalog })
    }

    /// The page size declared in the database header.
    pub fn page_size(&self) -> u32 {
        self.pager.page_size()
    }

    /// Number of tables in the catalog, internal `sqlite_*` tables included.
    pub fn table_count(&self) -> usize {
        self.catalog.table_count()
    }

    /// Table names in schema order, internal `sqlite_*` tables included;
    /// callers that want user tables only filter at their boundary.
    pub fn table_names(&self) -> Vec<String> {
        self.catalog.table_names()
    }

    /// The loaded catalog, for callers that need more than names.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parses and evaluates one SQL statement, returning one pipe-joined
    /// line per result row.
    pub fn query(&self, sql: &str) -> Result<Vec<String>, Error> {
        Ok(eval::run_query(&self.pager, &self.catalog, sql)?)
    }

    /// Closes the database, releasing the file handle.  Dropping the value
    /// has the same effect; this form just makes the intent explicit.
    pub fn close(self) {}
}
