//! Maps page numbers to file offsets and reads fixed-size page buffers.
//!
//! The pager owns the open database file.  Pages are read on demand into
//! fresh buffers owned by the caller; the walkers that request them drop
//! them as soon as their stack frame pops, so memory stays bounded by tree
//! depth rather than database size.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::dbheader::{self, DbHeader, DB_HEADER_BYTES};

// Page numbers are 1-based, to match how SQLite numbers pages.
pub type PageNum = usize;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("error accessing database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("error in database header: {0}")]
    DbHeader(#[from] dbheader::Error),
    #[error("page number {0} is out of range for this database")]
    PageOutOfRange(PageNum),
}

pub struct Pager {
    // Positional reads need a seek, which takes &mut File; interior
    // mutability keeps the read path usable from shared references.
    file: RefCell<File>,
    page_size: u32,
    num_pages: usize,
}

impl Pager {
    /// Opens a database file read-only and validates its header.
    pub fn open(path: &str) -> Result<Pager, Error> {
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(false)
            .create(false)
            .open(path)?;

        let mut header = [0u8; DB_HEADER_BYTES];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;
        let h: DbHeader = DbHeader::parse(&header)?;

        let file_len = file.metadata()?.len();
        let num_pages = (file_len / h.page_size as u64) as usize;

        Ok(Pager {
            file: RefCell::new(file),
            page_size: h.page_size,
            num_pages,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Byte offset of a page within the file.
    fn offset(&self, pgnum: PageNum) -> u64 {
        (pgnum as u64 - 1) * self.page_size as u64
    }

    /// Reads one page into a fresh buffer of exactly `page_size` bytes.
    ///
    /// Page 1 includes the 100-byte database header at its front; callers
    /// interpreting page 1 as a b-tree page skip those bytes themselves.
    pub fn read_page(&self, pgnum: PageNum) -> Result<Vec<u8>, Error> {
        if pgnum < 1 || pgnum > self.num_pages {
            return Err(Error::PageOutOfRange(pgnum));
        }
        let mut buf = vec![0u8; self.page_size as usize];
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(self.offset(pgnum)))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) fn path_to_testdata(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

#[test]
fn test_open_db() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    assert_eq!(pager.page_size(), 4096);
}

#[test]
fn test_read_page() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    let p1 = pager.read_page(1).expect("Should have read page 1.");
    assert_eq!(p1.len(), 4096);
    // Page 1 starts with the database header magic.
    assert_eq!(&p1[..6], b"SQLite");
    let p2 = pager.read_page(2).expect("Should have read page 2.");
    assert_eq!(p2.len(), 4096);
}

#[test]
fn test_read_page_out_of_range() {
    let path = path_to_testdata("minimal.db");
    let pager = Pager::open(path.as_str()).expect("Should have opened db.");
    assert!(matches!(pager.read_page(0), Err(Error::PageOutOfRange(0))));
    assert!(matches!(
        pager.read_page(9999),
        Err(Error::PageOutOfRange(9999))
    ));
}
