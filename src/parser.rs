//! `parser` contains the generated parsing routines for SQL and tests on
//! them.  Lowering of the parse tree lives in `pt_to_ast`.

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "sql.pest"]
pub struct SQLParser;

#[cfg(test)]
mod tests {
    use super::*;
    use pest::Parser;

    #[test]
    fn test_parse_select_statements() {
        let cases = vec![
            "SELECT * FROM tbl",
            "select a,b,c fRoM tbl",
            "select name from apples",
            "SELECT COUNT(*) FROM apples",
            "select count(1) from apples",
            "SELECT id, name FROM apples WHERE color = 'Red'",
            "select name from apples where color = 'Light Green'",
            "select a from t where b = 7",
            "select a from t where b = 7.5",
            "SELECT   name\nFROM apples\nWHERE color = 'Yellow'",
        ];
        for case in cases {
            println!("case: {}", case);
            assert!(SQLParser::parse(Rule::select_stmt, case).is_ok());
        }
    }

    #[test]
    fn test_not_parse_invalid_select_statements() {
        let cases = vec![
            "CREATE TABLE foo (a int)",
            "SELECT",
            "SELECT * FROM",
            "FROM apples",
            "select from apples",
            "select * from apples where",
            "select * from apples where color =",
            "select * from apples where color 'Red'",
            "DELETE FROM apples",
        ];
        for case in cases {
            println!("case: {}", case);
            assert!(SQLParser::parse(Rule::select_stmt, case).is_err());
        }
    }

    #[test]
    fn test_parse_operators_lex_even_when_unsupported() {
        // Non-equality operators parse; rejecting them as unsupported is
        // the lowering step's job.
        for op in ["!=", "<>", "<", ">", "<=", ">="] {
            let stmt = format!("select a from t where b {} 1", op);
            assert!(SQLParser::parse(Rule::select_stmt, &stmt).is_ok());
        }
    }

    #[test]
    fn test_parse_literals() {
        let cases = vec!["1", "-12", "1.5", "-2.75", "'hi'", "'Light Green'", "''"];
        for case in cases {
            assert!(SQLParser::parse(Rule::literal, case).is_ok());
        }
        for case in ["\"hi\"", "abc"] {
            assert!(SQLParser::parse(Rule::literal, case).is_err());
        }
    }
}
