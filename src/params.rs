use serde::Deserialize;

/// Posts shown on each listing page.
pub const PAGE_SIZE: i64 = 10;

#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Requested 1-based page number; anything unparsable means page 1.
    pub fn number(&self) -> i64 {
        self.page
            .as_ref()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1)
    }
}

/// A window over an ordered collection. Out-of-range requests clamp to
/// the last valid page instead of erroring; an empty collection still
/// has one (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

impl PageWindow {
    pub fn clamp(total_items: i64, requested: i64) -> Self {
        let total_pages = ((total_items + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
        let number = requested.clamp(1, total_pages);
        PageWindow {
            number,
            total_pages,
            total_items,
        }
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * PAGE_SIZE
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            window: self,
            items,
        }
    }
}

#[derive(Debug)]
pub struct Page<T> {
    pub window: PageWindow,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn number(&self) -> i64 {
        self.window.number
    }

    pub fn total_pages(&self) -> i64 {
        self.window.total_pages
    }

    pub fn has_next(&self) -> bool {
        self.window.number < self.window.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.window.number > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_items_split_ten_and_three() {
        let first = PageWindow::clamp(13, 1);
        assert_eq!(first.number, 1);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.offset(), 0);
        assert_eq!(first.limit(), PAGE_SIZE);

        let second = PageWindow::clamp(13, 2);
        assert_eq!(second.number, 2);
        assert_eq!(second.offset(), 10);
        assert_eq!(second.total_items - second.offset(), 3);
    }

    #[test]
    fn out_of_range_clamps_to_last_page() {
        let window = PageWindow::clamp(13, 99);
        assert_eq!(window.number, 2);

        let window = PageWindow::clamp(13, -4);
        assert_eq!(window.number, 1);
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let window = PageWindow::clamp(0, 1);
        assert_eq!(window.number, 1);
        assert_eq!(window.total_pages, 1);

        let page = window.into_page(Vec::<()>::new());
        assert!(!page.has_next());
        assert!(!page.has_previous());
        assert!(page.items.is_empty());
    }

    #[test]
    fn page_metadata_tracks_position() {
        let exact = PageWindow::clamp(20, 2);
        assert_eq!(exact.total_pages, 2);

        let middle = PageWindow::clamp(25, 2).into_page(vec![(); 10]);
        assert!(middle.has_next());
        assert!(middle.has_previous());
    }

    #[test]
    fn query_parsing_is_lenient() {
        let q = PageQuery {
            page: Some("2".into()),
        };
        assert_eq!(q.number(), 2);

        let junk = PageQuery {
            page: Some("abc".into()),
        };
        assert_eq!(junk.number(), 1);

        let negative = PageQuery {
            page: Some("-3".into()),
        };
        assert_eq!(negative.number(), 1);

        assert_eq!(PageQuery::default().number(), 1);
    }
}
