//! Evaluates a parsed SELECT: resolves catalog entries, drives the b-tree
//! walkers with the right filter, projects columns and applies the
//! predicate.

use itertools::Itertools;
use log::debug;

use crate::ast::{Literal, Projection, SelectStatement, WhereEq};
use crate::btree;
use crate::btree::filter::{KeyFilter, RowIdFilter};
use crate::btree::table::TableRow;
use crate::pager::Pager;
use crate::schema::{Catalog, SchemaObject};
use crate::sql_value::SqlValue;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Parse(#[from] crate::pt_to_ast::Error),
    #[error("table {0} not found in database")]
    TableNotFound(String),
    #[error("column {column} not found in table {table}")]
    ColumnNotFound { column: String, table: String },
    #[error(transparent)]
    Btree(#[from] btree::Error),
}

/// Parses and evaluates one SQL statement, returning one rendered line per
/// result row.
pub fn run_query(pager: &Pager, catalog: &Catalog, sql: &str) -> Result<Vec<String>, Error> {
    let stmt = crate::pt_to_ast::parse_select_statement(sql)?;
    run_select(pager, catalog, &stmt)
}

fn run_select(
    pager: &Pager,
    catalog: &Catalog,
    stmt: &SelectStatement,
) -> Result<Vec<String>, Error> {
    let table = catalog
        .table(&stmt.from)
        .ok_or_else(|| Error::TableNotFound(stmt.from.clone()))?;

    // An equality predicate over an indexed column turns into an index walk
    // for the matching row ids followed by a row-id-filtered table walk;
    // the predicate is fully resolved by the index, so it is not re-checked
    // against the fetched rows.
    let mut rows: Vec<TableRow> = vec![];
    match stmt.where_clause.as_ref().and_then(|w| {
        catalog
            .index_on(&table.name, &w.column)
            .map(|idx| (w, idx))
    }) {
        Some((w, index)) => {
            let mut row_ids = vec![];
            let filter = KeyFilter::new(literal_to_value(&w.value));
            for entry in btree::index::Iterator::new(pager, index.root_page, filter) {
                row_ids.push(entry?.row_id);
            }
            row_ids.sort_unstable();
            debug!(
                "index {} resolved {} = {:?} to {} row ids",
                index.name,
                w.column,
                w.value,
                row_ids.len()
            );
            let filter = RowIdFilter::new(row_ids);
            for row in btree::table::Iterator::new(pager, table.root_page, Some(filter)) {
                rows.push(row?);
            }
        }
        None => {
            for row in btree::table::Iterator::new(pager, table.root_page, None) {
                let row = row?;
                if let Some(w) = stmt.where_clause.as_ref() {
                    if !predicate_matches(table, w, &row)? {
                        continue;
                    }
                }
                rows.push(row);
            }
        }
    }

    render(table, &stmt.projection, &rows)
}

// The stored record holds NULL for a column that aliases the row id; the
// row id carries its value.
fn column_value(table: &SchemaObject, col_idx: usize, row: &TableRow) -> SqlValue {
    if table.columns[col_idx].rowid_alias {
        return SqlValue::Int(row.row_id);
    }
    row.values.get(col_idx).cloned().unwrap_or(SqlValue::Null)
}

fn column_index(table: &SchemaObject, name: &str) -> Result<usize, Error> {
    table
        .columns
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::ColumnNotFound {
            column: name.to_string(),
            table: table.name.clone(),
        })
}

fn predicate_matches(table: &SchemaObject, w: &WhereEq, row: &TableRow) -> Result<bool, Error> {
    let idx = column_index(table, &w.column)?;
    let value = column_value(table, idx, row);
    Ok(value.loosely_equals(&literal_to_value(&w.value)))
}

fn literal_to_value(lit: &Literal) -> SqlValue {
    match lit {
        Literal::Int(i) => SqlValue::Int(*i),
        Literal::Real(f) => SqlValue::Real(*f),
        Literal::String(s) => SqlValue::Text(s.clone()),
    }
}

fn render(
    table: &SchemaObject,
    projection: &Projection,
    rows: &[TableRow],
) -> Result<Vec<String>, Error> {
    if projection.is_count() {
        return Ok(vec![rows.len().to_string()]);
    }

    let indexes: Vec<usize> = match projection {
        Projection::All => (0..table.columns.len()).collect(),
        Projection::Columns(names) => names
            .iter()
            .map(|n| column_index(table, n))
            .collect::<Result<_, _>>()?,
        Projection::Count => unreachable!("handled above"),
    };

    Ok(rows
        .iter()
        .map(|row| {
            indexes
                .iter()
                .map(|&i| render_value(&column_value(table, i, row)))
                .join("|")
        })
        .collect())
}

// NULL renders as the empty string, matching how the reference shell prints
// rows in list mode.
fn render_value(v: &SqlValue) -> String {
    match v {
        SqlValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::path_to_testdata;

    fn open(db: &str) -> (Pager, Catalog) {
        let pager = Pager::open(path_to_testdata(db).as_str()).expect("Should have opened db.");
        let catalog = Catalog::load(&pager).expect("Should have loaded catalog.");
        (pager, catalog)
    }

    #[test]
    fn test_count_star() {
        let (pager, catalog) = open("sample.db");
        let lines = run_query(&pager, &catalog, "SELECT COUNT(*) FROM apples").unwrap();
        assert_eq!(lines, vec!["4"]);
    }

    #[test]
    fn test_projection_single_column() {
        let (pager, catalog) = open("sample.db");
        let lines = run_query(&pager, &catalog, "SELECT name FROM apples").unwrap();
        assert_eq!(
            lines,
            vec!["Granny Smith", "Fuji", "Honeycrisp", "Golden Delicious"]
        );
    }

    #[test]
    fn test_projection_rowid_alias() {
        let (pager, catalog) = open("sample.db");
        let lines = run_query(&pager, &catalog, "SELECT id, name FROM apples").unwrap();
        assert_eq!(
            lines,
            vec![
                "1|Granny Smith",
                "2|Fuji",
                "3|Honeycrisp",
                "4|Golden Delicious"
            ]
        );
    }

    #[test]
    fn test_where_equality() {
        let (pager, catalog) = open("sample.db");
        let lines =
            run_query(&pager, &catalog, "SELECT id, name FROM apples WHERE color = 'Red'")
                .unwrap();
        assert_eq!(lines, vec!["2|Fuji"]);
    }

    #[test]
    fn test_where_equality_is_case_insensitive_on_values() {
        let (pager, catalog) = open("sample.db");
        let lines =
            run_query(&pager, &catalog, "SELECT name FROM apples WHERE color = 'yellow'")
                .unwrap();
        assert_eq!(lines, vec!["Golden Delicious"]);
    }

    #[test]
    fn test_select_star() {
        let (pager, catalog) = open("sample.db");
        let lines = run_query(&pager, &catalog, "SELECT * FROM apples").unwrap();
        assert_eq!(lines[0], "1|Granny Smith|Light Green");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_table_not_found() {
        let (pager, catalog) = open("sample.db");
        let err = run_query(&pager, &catalog, "SELECT * FROM pears").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(_)), "got {:?}", err);
    }

    #[test]
    fn test_column_not_found() {
        let (pager, catalog) = open("sample.db");
        let err = run_query(&pager, &catalog, "SELECT flavor FROM apples").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn test_index_and_scan_agree() {
        let (pager, catalog) = open("indexed.db");
        let by_index = run_query(
            &pager,
            &catalog,
            "SELECT id, name FROM companies WHERE country = 'belgium'",
        )
        .unwrap();

        // The name column has no index; the same predicate over an
        // equivalent unindexed value must agree with the index path.
        assert_eq!(by_index.len(), 34);
        assert_eq!(by_index[0], "1|company 0001");
        assert_eq!(by_index[1], "25|company 0025");

        let stmt = crate::pt_to_ast::parse_select_statement(
            "SELECT id, name FROM companies WHERE country = 'belgium'",
        )
        .unwrap();
        let table = catalog.table("companies").unwrap();
        let w = stmt.where_clause.as_ref().unwrap();
        let mut by_scan = vec![];
        for row in btree::table::Iterator::new(&pager, table.root_page, None) {
            let row = row.unwrap();
            if predicate_matches(table, w, &row).unwrap() {
                by_scan.push(format!(
                    "{}|{}",
                    row.row_id,
                    render_value(&row.values[1])
                ));
            }
        }
        assert_eq!(by_index, by_scan);
    }

    #[test]
    fn test_count_via_index() {
        let (pager, catalog) = open("indexed.db");
        let lines = run_query(
            &pager,
            &catalog,
            "SELECT COUNT(*) FROM companies WHERE country = 'japan'",
        )
        .unwrap();
        // ids with i % 24 == 9: 9, 33, ... <= 800.
        assert_eq!(lines, vec!["33"]);
    }
}
