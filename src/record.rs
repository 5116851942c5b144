//! B-tree cells hold records, which carry the column values of one row.
//!
//! A record is a header followed by a body.  The header starts with a
//! varint giving the total header size (its own bytes included), followed
//! by one serial-type varint per column.  The body holds the column values
//! back to back, each occupying exactly the width its serial type implies.

use crate::serial_type;
use crate::sql_value::SqlValue;
use crate::varint::{self, decode_varint};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("record header: {0}")]
    Varint(#[from] varint::TruncatedVarint),
    #[error("record value: {0}")]
    Serial(#[from] serial_type::Error),
    #[error("record header size {header_size} exceeds payload of {payload_len} bytes")]
    HeaderOverrun { header_size: usize, payload_len: usize },
    #[error("record value overruns its payload")]
    ValueOverrun,
}

/// Iterator over the values of one record payload.
///
/// Yields `(serial_type, bytes)` pairs, one per column, where `bytes` is
/// the value's slice of the body.  Values whose declared width would run
/// past the payload end fail fast rather than being clamped.
pub struct ValueIterator<'a> {
    data: &'a [u8],
    hdr_offset: usize,
    hdr_len: usize,
    value_offset: usize,
    failed: bool,
}

impl<'a> ValueIterator<'a> {
    pub fn new(payload: &'a [u8]) -> Result<ValueIterator<'a>, Error> {
        // "A record contains a header and a body, in that order. The header
        // begins with a single varint which determines the total number of
        // bytes in the header."
        let (hdr_len, hdr_len_len) = decode_varint(payload)?;
        let hdr_len = hdr_len as usize;
        if hdr_len > payload.len() || hdr_len < hdr_len_len {
            return Err(Error::HeaderOverrun {
                header_size: hdr_len,
                payload_len: payload.len(),
            });
        }
        Ok(ValueIterator {
            data: payload,
            hdr_offset: hdr_len_len,
            hdr_len,
            value_offset: hdr_len,
            failed: false,
        })
    }
}

impl<'a> Iterator for ValueIterator<'a> {
    type Item = Result<(i64, &'a [u8]), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.hdr_offset >= self.hdr_len {
            return None;
        }
        let (serial_type, bytes_read) = match decode_varint(&self.data[self.hdr_offset..self.hdr_len])
        {
            Ok(x) => x,
            Err(e) => {
                self.failed = true;
                return Some(Err(e.into()));
            }
        };
        self.hdr_offset += bytes_read;
        let serial_type = serial_type as i64;
        let value_len = match serial_type::serial_type_len(serial_type) {
            Ok(l) => l,
            Err(e) => {
                self.failed = true;
                return Some(Err(e.into()));
            }
        };
        if self.value_offset + value_len > self.data.len() {
            self.failed = true;
            return Some(Err(Error::ValueOverrun));
        }
        let value = &self.data[self.value_offset..self.value_offset + value_len];
        self.value_offset += value_len;
        Some(Ok((serial_type, value)))
    }
}

/// Decodes every column of a record payload into owned values.
pub fn parse_record(payload: &[u8]) -> Result<Vec<SqlValue>, Error> {
    let mut values = vec![];
    for item in ValueIterator::new(payload)? {
        let (serial_type, bytes) = item?;
        values.push(serial_type::decode_value(serial_type, bytes)?);
    }
    Ok(values)
}

#[test]
fn test_value_iterator_one_byte_int() {
    // 2 byte record header, record type is literal 1 (09), record body has
    // zero bytes.
    let test_record: &[u8] = &[0x02, 0x09];

    let mut vi = ValueIterator::new(test_record).unwrap();
    assert_eq!(vi.next().unwrap().unwrap(), (9, &[][..]));
    assert!(vi.next().is_none());
}

#[test]
fn test_value_iterator_five_one_byte_ints() {
    let test_record: &[u8] = &[
        0x06, 0x01, 0x01, 0x01, 0x01, 0x01, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    ];

    let values: Vec<(i64, &[u8])> = ValueIterator::new(test_record)
        .unwrap()
        .map(|x| x.unwrap())
        .collect();
    assert_eq!(
        values,
        vec![
            (1, &[10u8][..]),
            (1, &[11u8][..]),
            (1, &[12u8][..]),
            (1, &[13u8][..]),
            (1, &[14u8][..]),
        ]
    );
}

#[test]
fn test_parse_record_various_types() {
    use SqlValue::*;
    // literal 0 | literal 1 | float 3.1415 | "Ten" | NULL
    let test_record: &[u8] = &[
        0x06, 0x08, 0x09, 0x07, 0x13, 0x00, 0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f, 0x54,
        0x65, 0x6e,
    ];

    let values = parse_record(test_record).unwrap();
    assert_eq!(
        values,
        vec![Int(0), Int(1), Real(3.1415), Text("Ten".to_string()), Null]
    );
}

#[test]
fn test_record_length_invariant() {
    // The widths implied by the header's serial types add up to exactly the
    // body length.
    let test_record: &[u8] = &[
        0x06, 0x08, 0x09, 0x07, 0x13, 0x00, 0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f, 0x54,
        0x65, 0x6e,
    ];
    let (hdr_len, _) = decode_varint(test_record).unwrap();
    let width_sum: usize = ValueIterator::new(test_record)
        .unwrap()
        .map(|x| serial_type::serial_type_len(x.unwrap().0).unwrap())
        .sum();
    assert_eq!(width_sum, test_record.len() - hdr_len as usize);
}

#[test]
fn test_parse_record_fails_fast_on_overrun() {
    // Header declares a 6-byte text value but the body holds only 3 bytes.
    let truncated: &[u8] = &[0x02, 0x19, 0x54, 0x65, 0x6e];
    assert!(matches!(parse_record(truncated), Err(Error::ValueOverrun)));

    // Header size larger than the whole payload.
    let bad_header: &[u8] = &[0x7f, 0x01];
    assert!(matches!(
        parse_record(bad_header),
        Err(Error::HeaderOverrun { .. })
    ));
}
