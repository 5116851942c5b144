//! One decoded b-tree page: buffer, header, cell pointers, and on-demand
//! cell decoding.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use super::header::PageHeader;
use super::{Error, PageType, RowId};
use crate::dbheader::DB_HEADER_BYTES;
use crate::pager::PageNum;
use crate::varint::decode_varint;

/// One cell, decoded according to the page type that holds it.
///
/// Payload slices borrow from the page buffer; they are valid for as long
/// as the `Page` is.
#[derive(Debug, PartialEq, Eq)]
pub enum Cell<'a> {
    // Table B-Tree Leaf Cell (page type 0x0d):
    //   varint payload size, varint rowid, payload record.
    TableLeaf { row_id: RowId, payload: &'a [u8] },
    // Table B-Tree Interior Cell (page type 0x05):
    //   4-byte big-endian left child page number, varint rowid.
    TableInterior { left_child: PageNum, row_id: RowId },
    // Index B-Tree Leaf Cell (page type 0x0a):
    //   varint payload size, payload record.
    IndexLeaf { payload: &'a [u8] },
    // Index B-Tree Interior Cell (page type 0x02):
    //   4-byte big-endian left child page number, varint payload size,
    //   payload record.
    IndexInterior {
        left_child: PageNum,
        payload: &'a [u8],
    },
}

/// A page buffer coupled with its decoded header and cell pointer array.
pub struct Page {
    number: PageNum,
    buf: Vec<u8>,
    header: PageHeader,
    cell_ptrs: Vec<usize>,
}

impl Page {
    /// Decodes the header and cell pointer array of a raw page buffer.
    ///
    /// On page 1 the b-tree content starts after the 100-byte database
    /// header; cell pointers are page-absolute offsets either way.
    pub fn parse(number: PageNum, buf: Vec<u8>) -> Result<Page, Error> {
        let base = if number == 1 { DB_HEADER_BYTES } else { 0 };
        let header = PageHeader::parse(&buf, base)?;

        let array_start = base + header.page_type.header_len();
        let array_end = array_start + 2 * header.cell_count;
        if array_end > buf.len() {
            return Err(Error::TruncatedPage);
        }
        let mut c = Cursor::new(&buf[array_start..array_end]);
        let mut cell_ptrs = Vec::with_capacity(header.cell_count);
        for _ in 0..header.cell_count {
            let off = c
                .read_u16::<BigEndian>()
                .map_err(|_| Error::TruncatedPage)? as usize;
            if off >= buf.len() {
                return Err(Error::CellPointerOutOfRange {
                    offset: off,
                    page_size: buf.len(),
                });
            }
            cell_ptrs.push(off);
        }

        Ok(Page {
            number,
            buf,
            header,
            cell_ptrs,
        })
    }

    pub fn number(&self) -> PageNum {
        self.number
    }

    pub fn header(&self) -> &PageHeader {
        &self.header
    }

    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    pub fn cell_count(&self) -> usize {
        self.cell_ptrs.len()
    }

    /// Decodes cell `idx` (cell-pointer-array order).
    pub fn cell(&self, idx: usize) -> Result<Cell<'_>, Error> {
        let rest = &self.buf[self.cell_ptrs[idx]..];
        match self.header.page_type {
            PageType::TableLeaf => {
                let (payload_size, n) = decode_varint(rest)?;
                let (row_id, m) = decode_varint(&rest[n..])?;
                let payload = take_payload(&rest[n + m..], payload_size as usize)?;
                Ok(Cell::TableLeaf {
                    row_id: row_id as RowId,
                    payload,
                })
            }
            PageType::TableInterior => {
                let left_child = read_child_pointer(rest)?;
                let (row_id, _) = decode_varint(&rest[4..])?;
                Ok(Cell::TableInterior {
                    left_child,
                    row_id: row_id as RowId,
                })
            }
            PageType::IndexLeaf => {
                let (payload_size, n) = decode_varint(rest)?;
                let payload = take_payload(&rest[n..], payload_size as usize)?;
                Ok(Cell::IndexLeaf { payload })
            }
            PageType::IndexInterior => {
                let left_child = read_child_pointer(rest)?;
                let (payload_size, n) = decode_varint(&rest[4..])?;
                let payload = take_payload(&rest[4 + n..], payload_size as usize)?;
                Ok(Cell::IndexInterior {
                    left_child,
                    payload,
                })
            }
        }
    }
}

fn read_child_pointer(rest: &[u8]) -> Result<PageNum, Error> {
    if rest.len() < 4 {
        return Err(Error::CellOverrun);
    }
    let mut c = Cursor::new(rest);
    Ok(c.read_u32::<BigEndian>().map_err(|_| Error::CellOverrun)? as PageNum)
}

// Payloads that spill to overflow pages are out of scope; a declared size
// larger than what remains on the page is refused.
fn take_payload(rest: &[u8], payload_size: usize) -> Result<&[u8], Error> {
    if payload_size > rest.len() {
        return Err(Error::CellOverrun);
    }
    Ok(&rest[..payload_size])
}
