//! Abstract syntax tree for the accepted SELECT subset.

use enum_as_inner::EnumAsInner;

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Projection {
    /// `SELECT *`
    All,
    /// `SELECT COUNT(...)`
    Count,
    /// `SELECT a, b, c`
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Literal {
    Int(i64),
    Real(f64),
    String(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(x) => x.fmt(f),
            Literal::Real(x) => x.fmt(f),
            Literal::String(x) => x.fmt(f),
        }
    }
}

/// `WHERE <column> = <literal>`; equality is the only supported operator.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereEq {
    pub column: String,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub projection: Projection,
    pub from: String,
    pub where_clause: Option<WhereEq>,
}
