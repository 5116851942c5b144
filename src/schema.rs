//! Interprets the schema table on page 1 and builds the in-memory catalog.
//!
//! Page 1 is the root of a table b-tree whose rows have the shape
//! `CREATE TABLE sqlite_schema (type text, name text, tbl_name text,
//! rootpage integer, sql text)`.  Each row describes one table, index, view
//! or trigger; tables and indexes carry the root page of their b-tree.

use log::warn;

use crate::btree;
use crate::pager::{PageNum, Pager};
use crate::sql_value::SqlValue;

const SCHEMA_ROOT_PAGENUM: PageNum = 1;

const SCHEMA_TYPE_COLIDX: usize = 0;
const SCHEMA_NAME_COLIDX: usize = 1;
const SCHEMA_TBL_NAME_COLIDX: usize = 2;
const SCHEMA_ROOTPAGE_COLIDX: usize = 3;
const SCHEMA_SQL_COLIDX: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("walking the schema table: {0}")]
    Btree(#[from] btree::Error),
    #[error("schema row {row_id} is malformed: {reason}")]
    MalformedRow { row_id: i64, reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Index,
    View,
    Trigger,
}

impl ObjectKind {
    // Unknown type text is tolerated rather than refused; files written by
    // newer SQLite versions may list kinds this engine has never heard of.
    fn from_type_text(s: &str) -> ObjectKind {
        match s {
            "table" => ObjectKind::Table,
            "index" => ObjectKind::Index,
            "view" => ObjectKind::View,
            "trigger" => ObjectKind::Trigger,
            other => {
                warn!("unknown schema object type {:?}, treating as table", other);
                ObjectKind::Table
            }
        }
    }
}

/// One column (or index key) definition extracted from creation SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// Whether this column aliases the row id (`INTEGER PRIMARY KEY`).
    /// Such columns are stored as NULL in the record; the row id carries
    /// their value.
    pub rowid_alias: bool,
}

/// One row of the schema table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    pub kind: ObjectKind,
    pub name: String,
    pub tbl_name: String,
    pub root_page: PageNum,
    pub sql: Option<String>,
    pub columns: Vec<ColumnDef>,
}

/// In-memory projection of the schema table, built once at open and read
/// only thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    objects: Vec<SchemaObject>,
}

impl Catalog {
    /// Walks the schema b-tree (which may span interior and leaf pages) and
    /// catalogs every row.
    pub fn load(pager: &Pager) -> Result<Catalog, Error> {
        let mut objects = vec![];
        for row in btree::table::Iterator::new(pager, SCHEMA_ROOT_PAGENUM, None) {
            let row = row?;
            let get = |idx: usize| -> Result<&SqlValue, Error> {
                row.values.get(idx).ok_or(Error::MalformedRow {
                    row_id: row.row_id,
                    reason: "fewer than 5 columns",
                })
            };

            let kind = match get(SCHEMA_TYPE_COLIDX)? {
                SqlValue::Text(s) => ObjectKind::from_type_text(s),
                _ => {
                    return Err(Error::MalformedRow {
                        row_id: row.row_id,
                        reason: "type column is not text",
                    })
                }
            };
            let name = match get(SCHEMA_NAME_COLIDX)? {
                SqlValue::Text(s) => s.clone(),
                _ => {
                    return Err(Error::MalformedRow {
                        row_id: row.row_id,
                        reason: "name column is not text",
                    })
                }
            };
            let tbl_name = match get(SCHEMA_TBL_NAME_COLIDX)? {
                SqlValue::Text(s) => s.clone(),
                _ => {
                    return Err(Error::MalformedRow {
                        row_id: row.row_id,
                        reason: "tbl_name column is not text",
                    })
                }
            };
            // Views and triggers store NULL here; tables and indexes store
            // an integer of whatever serial-type width fits.
            let root_page = match get(SCHEMA_ROOTPAGE_COLIDX)? {
                SqlValue::Int(n) if *n >= 0 => *n as PageNum,
                SqlValue::Null => 0,
                _ => {
                    return Err(Error::MalformedRow {
                        row_id: row.row_id,
                        reason: "rootpage column is not an integer",
                    })
                }
            };
            let sql = match get(SCHEMA_SQL_COLIDX)? {
                SqlValue::Text(s) => Some(s.clone()),
                // Internal objects such as auto-indexes have no SQL.
                _ => None,
            };
            let columns = sql.as_deref().map(parse_column_defs).unwrap_or_default();

            objects.push(SchemaObject {
                kind,
                name,
                tbl_name,
                root_page,
                sql,
                columns,
            });
        }
        Ok(Catalog { objects })
    }

    pub fn objects(&self) -> &[SchemaObject] {
        &self.objects
    }

    /// Looks a table up by name, case-insensitively.
    pub fn table(&self, name: &str) -> Option<&SchemaObject> {
        self.objects
            .iter()
            .find(|o| o.kind == ObjectKind::Table && o.name.eq_ignore_ascii_case(name))
    }

    /// Finds an index on `table` whose first key column is `column`.
    pub fn index_on(&self, table: &str, column: &str) -> Option<&SchemaObject> {
        self.objects.iter().find(|o| {
            o.kind == ObjectKind::Index
                && o.tbl_name.eq_ignore_ascii_case(table)
                && o.columns
                    .first()
                    .map(|c| c.name.eq_ignore_ascii_case(column))
                    .unwrap_or(false)
        })
    }

    /// Names of the table-kind catalog rows, internal ones included.
    pub fn table_names(&self) -> Vec<String> {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Table)
            .map(|o| o.name.clone())
            .collect()
    }

    pub fn table_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Table)
            .count()
    }
}

/// Extracts column definitions from `CREATE TABLE` / `CREATE INDEX` text:
/// the text between the first `(` and the last `)`, split on top-level
/// commas, each piece trimmed.  The first word of a piece is the column
/// name; quoting with `"`, `` ` `` or `[` is stripped.
pub fn parse_column_defs(sql: &str) -> Vec<ColumnDef> {
    let open = match sql.find('(') {
        Some(i) => i,
        None => return vec![],
    };
    let close = match sql.rfind(')') {
        Some(i) if i > open => i,
        _ => return vec![],
    };
    let inner = &sql[open + 1..close];

    let mut defs = vec![];
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut pieces = vec![];
    for (i, ch) in inner.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            // Defaults and CHECK expressions nest commas inside parens;
            // only depth-0 commas separate columns.
            ',' if depth == 0 => {
                pieces.push(&inner[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&inner[start..]);

    for piece in pieces {
        let decl = piece.trim();
        if decl.is_empty() {
            continue;
        }
        let raw_name = decl.split_whitespace().next().unwrap_or_default();
        let name = raw_name
            .trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']')
            .to_string();
        let rowid_alias = decl.to_ascii_lowercase().contains("integer primary key");
        defs.push(ColumnDef { name, rowid_alias });
    }
    defs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::path_to_testdata;

    fn names(defs: &[ColumnDef]) -> Vec<&str> {
        defs.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_parse_column_defs() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            ("CREATE TABLE t (a int)", vec!["a"]),
            ("CREATE TABLE t (a int, b text, c real)", vec!["a", "b", "c"]),
            (
                "CREATE TABLE apples (id integer primary key, name text, color text)",
                vec!["id", "name", "color"],
            ),
            (
                "CREATE TABLE t (\n  a int,\n  b text\n)",
                vec!["a", "b"],
            ),
            // Nested parens inside a default do not split columns.
            (
                "CREATE TABLE t (a int default (1 + 2), b text)",
                vec!["a", "b"],
            ),
            ("CREATE INDEX idx ON companies (country)", vec!["country"]),
            ("CREATE TABLE t (\"quoted name\" text)", vec!["quoted"]),
            ("no parens here", vec![]),
        ];
        for (sql, expected) in cases {
            println!("case: {}", sql);
            assert_eq!(names(&parse_column_defs(sql)), expected);
        }
    }

    #[test]
    fn test_rowid_alias_detection() {
        let defs =
            parse_column_defs("CREATE TABLE apples (id integer primary key, name text)");
        assert!(defs[0].rowid_alias);
        assert!(!defs[1].rowid_alias);

        let defs = parse_column_defs("CREATE TABLE t (id Integer Primary Key autoincrement)");
        assert!(defs[0].rowid_alias);

        // A plain "id int" column is not an alias.
        let defs = parse_column_defs("CREATE TABLE t (id int, valid text)");
        assert!(!defs[0].rowid_alias);
        assert!(!defs[1].rowid_alias);
    }

    #[test]
    fn test_catalog_from_minimal_db() {
        let pager = Pager::open(path_to_testdata("minimal.db").as_str()).unwrap();
        let catalog = Catalog::load(&pager).unwrap();
        assert_eq!(catalog.table_count(), 1);
        assert_eq!(catalog.table_names(), vec!["a".to_string()]);
        let t = catalog.table("a").unwrap();
        assert_eq!(t.root_page, 2);
        assert_eq!(names(&t.columns), vec!["b"]);
    }

    #[test]
    fn test_catalog_from_indexed_db() {
        let pager = Pager::open(path_to_testdata("indexed.db").as_str()).unwrap();
        let catalog = Catalog::load(&pager).unwrap();
        assert_eq!(catalog.table_count(), 1);

        let t = catalog.table("companies").unwrap();
        assert_eq!(names(&t.columns), vec!["id", "name", "country"]);
        assert!(t.columns[0].rowid_alias);

        let idx = catalog.index_on("companies", "country").unwrap();
        assert_eq!(idx.kind, ObjectKind::Index);
        assert_eq!(idx.name, "idx_companies_country");
        assert!(idx.root_page > 1);

        assert!(catalog.index_on("companies", "name").is_none());
        assert!(catalog.index_on("nosuch", "country").is_none());
    }

    #[test]
    fn test_catalog_is_deterministic() {
        let path = path_to_testdata("indexed.db");
        let a = Catalog::load(&Pager::open(path.as_str()).unwrap()).unwrap();
        let b = Catalog::load(&Pager::open(path.as_str()).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let pager = Pager::open(path_to_testdata("sample.db").as_str()).unwrap();
        let catalog = Catalog::load(&pager).unwrap();
        assert!(catalog.table("APPLES").is_some());
        assert!(catalog.table("apples").is_some());
        assert!(catalog.table("pears").is_none());
    }
}
