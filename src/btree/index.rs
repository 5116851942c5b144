//! Iterator over index-type b-trees, filtered by an equality key.
//!
//! Index records hold the indexed column values followed by the row id of
//! the table row they point at.  Matching cells appear on interior pages as
//! well as leaves, so interior cells are examined in-order between their
//! child descents.  Every child is descended: with case-insensitive
//! equality over binary-collated keys, subtree pruning by key comparison
//! could skip entries that differ from the literal only in case.

use log::debug;

use super::filter::KeyFilter;
use super::page::{Cell, Page};
use super::{Error, PageType, RowId};
use crate::pager::{PageNum, Pager};
use crate::record::parse_record;
use crate::sql_value::SqlValue;

/// One matching index entry: the row id the entry points at, plus the key
/// value that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub row_id: RowId,
    pub key: SqlValue,
}

struct Frame {
    page: Page,
    next_cell: usize,
    // Interior cell whose own record still needs examining once its left
    // subtree has been exhausted.
    pending_cell: Option<usize>,
    rightmost_done: bool,
}

impl Frame {
    fn new(page: Page) -> Frame {
        Frame {
            page,
            next_cell: 0,
            pending_cell: None,
            rightmost_done: false,
        }
    }
}

enum Step {
    Yield(IndexEntry),
    Descend(PageNum),
    Pop,
    Skip,
    Halt,
}

// Decodes an index record payload; a key match becomes an entry carrying
// the record's trailing row id.
fn match_payload(filter: &KeyFilter, payload: &[u8]) -> Result<Option<IndexEntry>, Error> {
    let values = parse_record(payload)?;
    let first = match values.first() {
        Some(v) => v,
        None => return Ok(None),
    };
    if !filter.matches(first) {
        return Ok(None);
    }
    // The row id is the record's last column.
    let row_id = match values.last() {
        Some(SqlValue::Int(id)) => *id,
        _ => return Ok(None),
    };
    Ok(Some(IndexEntry {
        row_id,
        key: first.clone(),
    }))
}

/// Lazy in-order traversal of one index b-tree, yielding entries whose
/// first key column equals the filter's literal.
pub struct Iterator<'p> {
    pager: &'p Pager,
    root_page: PageNum,
    filter: KeyFilter,
    stack: Vec<Frame>,
    started: bool,
    done: bool,
}

impl<'p> Iterator<'p> {
    pub fn new(pager: &'p Pager, root_page: PageNum, filter: KeyFilter) -> Iterator<'p> {
        Iterator {
            pager,
            root_page,
            filter,
            stack: vec![],
            started: false,
            done: false,
        }
    }

    fn load(&self, pgnum: PageNum) -> Result<Page, Error> {
        debug!("index walk: loading page {}", pgnum);
        let buf = self.pager.read_page(pgnum)?;
        let page = Page::parse(pgnum, buf)?;
        if page.page_type().is_table() {
            // Table pages have no business inside an index b-tree.
            return Err(Error::BadPageType(match page.page_type() {
                PageType::TableInterior => 0x05,
                _ => 0x0d,
            }));
        }
        Ok(page)
    }

    // Decides what to do at the frame on top of the stack.
    fn step(&mut self) -> Result<Step, Error> {
        let filter = &self.filter;
        let frame = match self.stack.last_mut() {
            None => return Ok(Step::Halt),
            Some(f) => f,
        };

        // An interior cell parked while its left subtree was walked is
        // examined before moving right, keeping the traversal in key order.
        if let Some(idx) = frame.pending_cell.take() {
            match frame.page.cell(idx)? {
                Cell::IndexInterior { payload, .. } => {
                    if let Some(entry) = match_payload(filter, payload)? {
                        return Ok(Step::Yield(entry));
                    }
                    return Ok(Step::Skip);
                }
                _ => unreachable!("interior index pages only decode interior cells"),
            }
        }

        match frame.page.page_type() {
            PageType::IndexLeaf => {
                if frame.next_cell >= frame.page.cell_count() {
                    return Ok(Step::Pop);
                }
                let idx = frame.next_cell;
                frame.next_cell += 1;
                match frame.page.cell(idx)? {
                    Cell::IndexLeaf { payload } => match match_payload(filter, payload)? {
                        Some(entry) => Ok(Step::Yield(entry)),
                        None => Ok(Step::Skip),
                    },
                    _ => unreachable!("leaf index pages only decode leaf cells"),
                }
            }
            PageType::IndexInterior => {
                if frame.next_cell < frame.page.cell_count() {
                    let idx = frame.next_cell;
                    frame.next_cell += 1;
                    frame.pending_cell = Some(idx);
                    match frame.page.cell(idx)? {
                        Cell::IndexInterior { left_child, .. } => Ok(Step::Descend(left_child)),
                        _ => unreachable!("interior index pages only decode interior cells"),
                    }
                } else if !frame.rightmost_done {
                    frame.rightmost_done = true;
                    let rightmost = frame
                        .page
                        .header()
                        .rightmost_pointer
                        .ok_or(Error::TruncatedPage)?;
                    Ok(Step::Descend(rightmost))
                } else {
                    Ok(Step::Pop)
                }
            }
            _ => unreachable!("load() rejects table pages"),
        }
    }
}

impl<'p> core::iter::Iterator for Iterator<'p> {
    type Item = Result<IndexEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            match self.load(self.root_page) {
                Ok(page) => self.stack.push(Frame::new(page)),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        loop {
            match self.step() {
                Ok(Step::Yield(entry)) => return Some(Ok(entry)),
                Ok(Step::Skip) => continue,
                Ok(Step::Pop) => {
                    self.stack.pop();
                }
                Ok(Step::Descend(pgnum)) => match self.load(pgnum) {
                    Ok(page) => self.stack.push(Frame::new(page)),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                Ok(Step::Halt) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::path_to_testdata;

    // The indexed fixture holds 800 companies cycling through 24 countries,
    // indexed by country; its index b-tree has an interior root at page 48.
    // Country "belgium" is row ids 1, 25, 49, ... 793.

    #[test]
    fn test_index_walk_finds_all_duplicates() {
        let pager = Pager::open(path_to_testdata("indexed.db").as_str())
            .expect("Should have opened db with pager.");
        let filter = KeyFilter::new(SqlValue::Text("belgium".to_string()));
        let mut ids: Vec<RowId> = Iterator::new(&pager, 48, filter)
            .map(|e| e.map(|entry| entry.row_id))
            .collect::<Result<_, _>>()
            .unwrap();
        ids.sort_unstable();
        let expected: Vec<RowId> = (0..).map(|i| 1 + 24 * i).take_while(|&id| id <= 800).collect();
        assert_eq!(ids.len(), 34);
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_index_walk_matches_case_insensitively() {
        let pager = Pager::open(path_to_testdata("indexed.db").as_str())
            .expect("Should have opened db with pager.");
        let filter = KeyFilter::new(SqlValue::Text("BELGIUM".to_string()));
        let ids: Vec<RowId> = Iterator::new(&pager, 48, filter)
            .map(|e| e.map(|entry| entry.row_id))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids.len(), 34);
    }

    #[test]
    fn test_index_walk_no_match() {
        let pager = Pager::open(path_to_testdata("indexed.db").as_str())
            .expect("Should have opened db with pager.");
        let filter = KeyFilter::new(SqlValue::Text("atlantis".to_string()));
        let entries: Vec<IndexEntry> = Iterator::new(&pager, 48, filter)
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(entries.is_empty());
    }
}
