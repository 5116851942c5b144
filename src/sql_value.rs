//! Defines an enum of all the possible values a stored column can hold.

use enum_as_inner::EnumAsInner;

/// One decoded column value.
///
/// The variants correspond to SQLite's storage classes: every serial type
/// materializes into one of these.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum SqlValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Equality as the query layer applies it: text compares
    /// case-insensitively, integers and reals compare numerically, and NULL
    /// equals nothing (not even NULL).
    pub fn loosely_equals(&self, other: &SqlValue) -> bool {
        use SqlValue::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Real(a), Real(b)) => a == b,
            (Int(a), Real(b)) | (Real(b), Int(a)) => *a as f64 == *b,
            (Text(a), Text(b)) => a.eq_ignore_ascii_case(b),
            (Blob(a), Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => "NULL".fmt(f),
            SqlValue::Int(x) => x.fmt(f),
            SqlValue::Real(x) => x.fmt(f),
            SqlValue::Text(x) => x.fmt(f),
            SqlValue::Blob(_) => "<BLOB>".fmt(f),
        }
    }
}

#[test]
fn test_loosely_equals() {
    use SqlValue::*;
    let cases: Vec<(SqlValue, SqlValue, bool)> = vec![
        (Int(1), Int(1), true),
        (Int(1), Int(2), false),
        (Int(2), Real(2.0), true),
        (Real(2.0), Int(2), true),
        (Real(2.5), Real(2.5), true),
        (Text("Red".to_string()), Text("red".to_string()), true),
        (Text("Red".to_string()), Text("blue".to_string()), false),
        (Text("1".to_string()), Int(1), false),
        (Null, Null, false),
        (Null, Int(0), false),
        (Blob(vec![1, 2]), Blob(vec![1, 2]), true),
    ];
    for (i, (a, b, expected)) in cases.iter().enumerate() {
        println!("case {}: {:?} = {:?}", i, a, b);
        assert_eq!(a.loosely_equals(b), *expected);
    }
}
