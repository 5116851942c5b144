//! `pt_to_ast` has routines for converting SQL parse trees to ASTs.
//!
//! A pest parse tree has one enum for all possible terminals and
//! non-terminals; the AST keeps only what evaluation needs and discards
//! lexical detail like case and position.  Restrictions that are not
//! syntax errors (aggregates other than COUNT, operators other than `=`)
//! are rejected here so they surface as "unsupported".

use pest::iterators::Pair;
use pest::Parser;

use crate::ast::{Literal, Projection, SelectStatement, WhereEq};
use crate::parser::{Rule, SQLParser};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("SQL syntax error: {0}")]
    Syntax(Box<pest::error::Error<Rule>>),
    #[error("unsupported SQL: {0}")]
    Unsupported(String),
}

/// Parses one `SELECT` statement into its AST.
pub fn parse_select_statement(query: &str) -> Result<SelectStatement, Error> {
    let select_stmt = SQLParser::parse(Rule::select_stmt, query)
        .map_err(|e| Error::Syntax(Box::new(e)))?
        .next()
        .expect("parse returned no select_stmt pair");

    let mut projection: Option<Projection> = None;
    let mut from: Option<String> = None;
    let mut where_clause: Option<WhereEq> = None;

    for part in select_stmt.into_inner() {
        match part.as_rule() {
            Rule::select_items => projection = Some(lower_projection(part)?),
            Rule::table_identifier => from = Some(part.as_str().to_string()),
            Rule::where_clause => where_clause = Some(lower_where(part)?),
            Rule::EOI => (),
            rule => unreachable!("unexpected rule in select_stmt: {:?}", rule),
        }
    }

    Ok(SelectStatement {
        projection: projection
            .ok_or_else(|| Error::Unsupported("projection list is empty".to_string()))?,
        from: from.ok_or_else(|| Error::Unsupported("missing FROM clause".to_string()))?,
        where_clause,
    })
}

fn lower_projection(pair: Pair<Rule>) -> Result<Projection, Error> {
    let item = pair
        .into_inner()
        .next()
        .expect("select_items has exactly one alternative");
    match item.as_rule() {
        Rule::star => Ok(Projection::All),
        Rule::function_call => {
            let mut inner = item.into_inner();
            let name = inner.next().expect("function has a name").as_str();
            if !name.eq_ignore_ascii_case("count") {
                return Err(Error::Unsupported(format!(
                    "aggregate function {}() (only COUNT is supported)",
                    name
                )));
            }
            Ok(Projection::Count)
        }
        Rule::column_list => Ok(Projection::Columns(
            item.into_inner().map(|c| c.as_str().to_string()).collect(),
        )),
        rule => unreachable!("unexpected projection rule: {:?}", rule),
    }
}

fn lower_where(pair: Pair<Rule>) -> Result<WhereEq, Error> {
    let mut inner = pair.into_inner();
    let column = inner.next().expect("where has a column").as_str().to_string();
    let op = inner.next().expect("where has an operator").as_str();
    let literal = inner.next().expect("where has a literal");
    if op != "=" {
        return Err(Error::Unsupported(format!(
            "WHERE operator {:?} (only = is supported)",
            op
        )));
    }
    Ok(WhereEq {
        column,
        value: lower_literal(literal)?,
    })
}

fn lower_literal(pair: Pair<Rule>) -> Result<Literal, Error> {
    let lit = pair
        .into_inner()
        .next()
        .expect("literal has exactly one alternative");
    match lit.as_rule() {
        Rule::single_quoted_string => {
            let s = lit.as_str();
            // Strip the single pair of surrounding quotes.
            Ok(Literal::String(s[1..s.len() - 1].to_string()))
        }
        Rule::integer_literal => lit
            .as_str()
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| Error::Unsupported(format!("integer literal {} out of range", lit.as_str()))),
        Rule::decimal_literal => lit
            .as_str()
            .parse::<f64>()
            .map(Literal::Real)
            .map_err(|_| Error::Unsupported(format!("malformed numeric literal {}", lit.as_str()))),
        rule => unreachable!("unexpected literal rule: {:?}", rule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select_statement() {
        let cases: Vec<(&str, SelectStatement)> = vec![
            (
                "SELECT * FROM apples",
                SelectStatement {
                    projection: Projection::All,
                    from: "apples".to_string(),
                    where_clause: None,
                },
            ),
            (
                "select COUNT(*) from apples",
                SelectStatement {
                    projection: Projection::Count,
                    from: "apples".to_string(),
                    where_clause: None,
                },
            ),
            (
                "select name, color from apples",
                SelectStatement {
                    projection: Projection::Columns(vec![
                        "name".to_string(),
                        "color".to_string(),
                    ]),
                    from: "apples".to_string(),
                    where_clause: None,
                },
            ),
            (
                "SELECT id, name FROM apples WHERE color = 'Red'",
                SelectStatement {
                    projection: Projection::Columns(vec!["id".to_string(), "name".to_string()]),
                    from: "apples".to_string(),
                    where_clause: Some(WhereEq {
                        column: "color".to_string(),
                        value: Literal::String("Red".to_string()),
                    }),
                },
            ),
            (
                "select a from t where b = 7",
                SelectStatement {
                    projection: Projection::Columns(vec!["a".to_string()]),
                    from: "t".to_string(),
                    where_clause: Some(WhereEq {
                        column: "b".to_string(),
                        value: Literal::Int(7),
                    }),
                },
            ),
        ];
        for (input, expected) in cases {
            println!("input: {}", input);
            assert_eq!(parse_select_statement(input).unwrap(), expected);
        }
    }

    #[test]
    fn test_quoted_literal_keeps_inner_spaces() {
        let stmt = parse_select_statement("select name from apples where color = 'Light Green'")
            .unwrap();
        assert_eq!(
            stmt.where_clause.unwrap().value,
            Literal::String("Light Green".to_string())
        );
    }

    #[test]
    fn test_unsupported_operator() {
        let err = parse_select_statement("select a from t where b != 1").unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)), "got {:?}", err);
    }

    #[test]
    fn test_unsupported_aggregate() {
        let err = parse_select_statement("select max(a) from t").unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)), "got {:?}", err);
    }

    #[test]
    fn test_syntax_errors() {
        for input in ["select", "update t set a = 1", "select * from t where a"] {
            let err = parse_select_statement(input).unwrap_err();
            assert!(matches!(err, Error::Syntax(_)), "got {:?}", err);
        }
    }
}
