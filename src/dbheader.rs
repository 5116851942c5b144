//! dbheader reads the 100-byte header at the front of a database file.
//!
//! Of the many header fields, only the page size drives this engine; the
//! magic string is checked so that files which are not SQLite databases are
//! refused instead of misread.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("the magic bytes for this file are wrong; not a SQLite database")]
    WrongMagic,
    #[error("page size {0} is not supported (must be a power of two in 512..=32768, or 1 for 65536)")]
    UnsupportedPagesize(u16),
    #[error("file is shorter than the 100-byte database header")]
    Truncated,
}

/// Number of bytes occupied by the database file header on page 1.
pub const DB_HEADER_BYTES: usize = 100;

const SQLITE3_MAGIC_STRING: &[u8; 16] = b"SQLite format 3\0";

// The database file header.  Everything past the page size is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbHeader {
    pub page_size: u32,
}

impl DbHeader {
    pub fn parse(buf: &[u8]) -> Result<DbHeader, Error> {
        if buf.len() < DB_HEADER_BYTES {
            return Err(Error::Truncated);
        }
        let mut c = Cursor::new(buf);

        // Offset	Size	Description
        // 0        16	    The header string: "SQLite format 3\000"
        let mut magic = [0u8; 16];
        c.read_exact(&mut magic).map_err(|_| Error::Truncated)?;
        if &magic != SQLITE3_MAGIC_STRING {
            return Err(Error::WrongMagic);
        }

        // 16	    2	    The database page size in bytes. Must be a power of two
        //                  between 512 and 32768 inclusive, or the value 1
        //                  representing a page size of 65536.
        let raw = c.read_u16::<BigEndian>().map_err(|_| Error::Truncated)?;
        let page_size: u32 = match raw {
            1 => 65536,
            512 | 1024 | 2048 | 4096 | 8192 | 16384 | 32768 => raw as u32,
            other => return Err(Error::UnsupportedPagesize(other)),
        };

        // Bytes 18..100 carry journaling, freelist, vacuum and versioning
        // state that a read-only b-tree walk never consults.

        Ok(DbHeader { page_size })
    }
}

#[cfg(test)]
fn header_bytes(page_size_field: u16) -> Vec<u8> {
    let mut v = vec![0u8; DB_HEADER_BYTES];
    v[..16].copy_from_slice(SQLITE3_MAGIC_STRING);
    v[16..18].copy_from_slice(&page_size_field.to_be_bytes());
    v
}

#[test]
fn test_parse_header() {
    let cases: Vec<(u16, u32)> = vec![
        (512, 512),
        (1024, 1024),
        (4096, 4096),
        (32768, 32768),
        (1, 65536),
    ];
    for (field, expected) in cases {
        let h = DbHeader::parse(&header_bytes(field)).unwrap();
        assert_eq!(h.page_size, expected);
    }
}

#[test]
fn test_parse_header_errors() {
    // Wrong magic.
    let mut bad_magic = header_bytes(4096);
    bad_magic[0] = b'X';
    assert_eq!(DbHeader::parse(&bad_magic), Err(Error::WrongMagic));

    // Page sizes outside the supported table.
    for field in [0u16, 2, 256, 513, 3000] {
        assert_eq!(
            DbHeader::parse(&header_bytes(field)),
            Err(Error::UnsupportedPagesize(field))
        );
    }

    // Short buffer.
    assert_eq!(DbHeader::parse(&[0u8; 40]), Err(Error::Truncated));
}
