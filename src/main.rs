use anyhow::{Context, Result};

// Usage: roqlite <db-path> <command>
// where <command> is `.dbinfo`, `.tables`, or a SQL SELECT statement.
fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: roqlite <db-path> <command>")?;
    let command = args.next().context("usage: roqlite <db-path> <command>")?;

    let db = roqlite::Database::open(&path)
        .with_context(|| format!("failed to open database {}", path))?;

    match command.as_str() {
        ".dbinfo" => {
            println!("database page size: {}", db.page_size());
            println!("number of tables: {}", db.table_count());
        }
        ".tables" => {
            let mut line = String::new();
            for name in db.table_names() {
                if name.contains("sqlite_") {
                    continue;
                }
                line.push_str(&name);
                line.push(' ');
            }
            println!("{}", line);
        }
        sql => {
            for line in db.query(sql)? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
