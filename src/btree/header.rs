//! Types and methods for b-tree page headers.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Seek, SeekFrom};

use super::{Error, PageType};
use crate::pager::PageNum;

// A b-tree page is divided into regions in the following order:
// 1 The 100-byte database file header (found on page 1 only)
// 2 The 8 or 12 byte b-tree page header
// 3 The cell pointer array
// 4 Unallocated space
// 5 The cell content area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub first_freeblock: u32,
    pub cell_count: usize,
    pub cell_content_start: u32,
    pub rightmost_pointer: Option<PageNum>,
}

impl PageHeader {
    /// Parses the page header found at `base` within the page buffer.
    ///
    /// `base` is 100 for page 1 (the database file header precedes the
    /// b-tree content) and 0 for every other page.
    pub fn parse(page: &[u8], base: usize) -> Result<PageHeader, Error> {
        let mut c = Cursor::new(page);
        c.seek(SeekFrom::Start(base as u64))
            .map_err(|_| Error::TruncatedPage)?;

        // Offset 0, size 1: the b-tree page type flag.
        let page_type = PageType::from_byte(c.read_u8().map_err(|_| Error::TruncatedPage)?)?;

        // Offset 1, size 2: start of the first freeblock, or zero.
        let first_freeblock = c
            .read_u16::<BigEndian>()
            .map_err(|_| Error::TruncatedPage)? as u32;

        // Offset 3, size 2: the number of cells on the page.
        let cell_count = c
            .read_u16::<BigEndian>()
            .map_err(|_| Error::TruncatedPage)? as usize;

        // Offset 5, size 2: start of the cell content area; zero means 65536.
        let cell_content_start = match c
            .read_u16::<BigEndian>()
            .map_err(|_| Error::TruncatedPage)?
        {
            0 => 65536,
            x => x as u32,
        };

        // Offset 7, size 1: fragmented free byte count; unused here.
        let _ = c.read_u8().map_err(|_| Error::TruncatedPage)?;

        // Offset 8, size 4: the rightmost child pointer, interior pages only.
        let rightmost_pointer = if page_type.is_interior() {
            Some(
                c.read_u32::<BigEndian>()
                    .map_err(|_| Error::TruncatedPage)? as PageNum,
            )
        } else {
            None
        };

        Ok(PageHeader {
            page_type,
            first_freeblock,
            cell_count,
            cell_content_start,
            rightmost_pointer,
        })
    }
}

#[cfg(test)]
fn leaf_header_bytes(cell_count: u16, content_start: u16) -> Vec<u8> {
    let mut v = vec![0u8; 512];
    v[0] = 0x0d;
    v[3..5].copy_from_slice(&cell_count.to_be_bytes());
    v[5..7].copy_from_slice(&content_start.to_be_bytes());
    v
}

#[test]
fn test_parse_leaf_header() {
    let page = leaf_header_bytes(3, 400);
    let hdr = PageHeader::parse(&page, 0).unwrap();
    assert_eq!(hdr.page_type, PageType::TableLeaf);
    assert_eq!(hdr.cell_count, 3);
    assert_eq!(hdr.cell_content_start, 400);
    assert_eq!(hdr.rightmost_pointer, None);
}

#[test]
fn test_parse_interior_header() {
    let mut page = vec![0u8; 512];
    page[0] = 0x05;
    page[3..5].copy_from_slice(&2u16.to_be_bytes());
    page[5..7].copy_from_slice(&300u16.to_be_bytes());
    page[8..12].copy_from_slice(&7u32.to_be_bytes());
    let hdr = PageHeader::parse(&page, 0).unwrap();
    assert_eq!(hdr.page_type, PageType::TableInterior);
    assert_eq!(hdr.cell_count, 2);
    assert_eq!(hdr.rightmost_pointer, Some(7));
}

#[test]
fn test_parse_header_bad_type() {
    let mut page = leaf_header_bytes(1, 400);
    page[0] = 0x03;
    assert!(matches!(
        PageHeader::parse(&page, 0),
        Err(Error::BadPageType(0x03))
    ));
}

#[test]
fn test_zero_content_start_means_65536() {
    let page = leaf_header_bytes(0, 0);
    let hdr = PageHeader::parse(&page, 0).unwrap();
    assert_eq!(hdr.cell_content_start, 65536);
}
