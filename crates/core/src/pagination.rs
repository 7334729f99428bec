//! Offset/limit arithmetic for the paginated blog listing.

use crate::error::{StoreError, StoreResult};

pub const DEFAULT_PAGE_SIZE: u32 = 8;

/// A 1-based page of `page_size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> StoreResult<Self> {
        if page == 0 || page_size == 0 {
            return Err(StoreError::InvalidPage);
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Inclusive index of the last row on this page, as used by HTTP `Range` headers.
    pub fn range_end(&self) -> u64 {
        self.offset() + u64::from(self.page_size) - 1
    }

    /// Rejects pages past the end once the total row count is known.
    /// Page 1 is always valid so an empty table can still be listed.
    pub fn check_against(&self, total: u64) -> StoreResult<()> {
        let last = total_pages(total, self.page_size);
        if self.page > 1 && self.page > last {
            return Err(StoreError::PageOutOfRange {
                page: self.page,
                total_pages: last,
            });
        }
        Ok(())
    }
}

/// One page of rows plus the exact row count of the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub total: u64,
}

pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 8, 0)]
    #[case(1, 8, 1)]
    #[case(8, 8, 1)]
    #[case(9, 8, 2)]
    #[case(20, 8, 3)]
    fn computes_total_pages(#[case] total: u64, #[case] size: u32, #[case] expected: u32) {
        assert_eq!(total_pages(total, size), expected);
    }

    #[test]
    fn third_page_of_twenty_covers_last_four_rows() {
        let request = PageRequest::new(3, 8).unwrap();
        assert_eq!(request.offset(), 16);
        assert_eq!(request.range_end(), 23);
        assert!(request.check_against(20).is_ok());
        let remaining = 20 - request.offset();
        assert_eq!(remaining.min(u64::from(request.page_size)), 4);
    }

    #[test]
    fn page_past_the_end_is_rejected() {
        let request = PageRequest::new(4, 8).unwrap();
        let err = request.check_against(20).unwrap_err();
        assert!(matches!(
            err,
            StoreError::PageOutOfRange {
                page: 4,
                total_pages: 3
            }
        ));
    }

    #[test]
    fn first_page_of_empty_table_is_valid() {
        let request = PageRequest::new(1, 8).unwrap();
        assert!(request.check_against(0).is_ok());
    }

    #[test]
    fn page_zero_is_invalid() {
        assert!(matches!(
            PageRequest::new(0, 8),
            Err(StoreError::InvalidPage)
        ));
    }
}
