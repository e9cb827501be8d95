//! Pagination over a category's files

use serde::Serialize;

use super::record::FileRecord;

/// One page of a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Records on this page
    pub files: Vec<FileRecord>,
    /// The page actually returned, after clamping (1-based)
    pub page: usize,
    /// Always at least 1, even for an empty category
    pub total_pages: usize,
    /// Records in the whole category
    pub total_files: usize,
}

impl Page {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Slice `files` into the requested page
///
/// Out-of-range page numbers clamp into `[1, total_pages]`. A page size of
/// zero is treated as one.
pub fn paginate(files: Vec<FileRecord>, page: usize, page_size: usize) -> Page {
    let page_size = page_size.max(1);
    let total_files = files.len();
    let total_pages = total_files.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_files);

    let files = if start < end {
        files.into_iter().skip(start).take(end - start).collect()
    } else {
        Vec::new()
    };

    Page {
        files,
        page,
        total_pages,
        total_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: i64) -> Vec<FileRecord> {
        (1..=n).map(|i| FileRecord::new(i, "photo")).collect()
    }

    #[test]
    fn test_twelve_records_five_per_page() {
        let first = paginate(records(12), 1, 5);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_files, 12);
        assert_eq!(first.files.len(), 5);
        assert_eq!(first.files[0].message_id, 1);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = paginate(records(12), 3, 5);
        assert_eq!(last.files.len(), 2);
        assert_eq!(last.files[0].message_id, 11);
        assert!(!last.has_next());
    }

    #[test]
    fn test_out_of_range_pages_clamp() {
        let low = paginate(records(12), 0, 5);
        assert_eq!(low.page, 1);
        assert_eq!(low.files.len(), 5);

        let high = paginate(records(12), 99, 5);
        assert_eq!(high.page, 3);
        assert_eq!(high.files.len(), 2);
    }

    #[test]
    fn test_empty_category_has_one_page() {
        for requested in [0, 1, 2, 50] {
            let page = paginate(Vec::new(), requested, 5);
            assert_eq!(page.page, 1);
            assert_eq!(page.total_pages, 1);
            assert_eq!(page.total_files, 0);
            assert!(page.files.is_empty());
        }
    }

    #[test]
    fn test_exact_multiple() {
        let page = paginate(records(10), 2, 5);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.files.len(), 5);
        assert_eq!(page.files[4].message_id, 10);
    }

    #[test]
    fn test_zero_page_size_treated_as_one() {
        let page = paginate(records(3), 2, 0);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.files, vec![FileRecord::new(2, "photo")]);
    }
}
