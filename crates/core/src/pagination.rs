//! Page arithmetic for post feeds.

use serde::Serialize;

/// Posts per feed page.
pub const PAGE_SIZE: u64 = 10;

/// Splits `count` items into fixed-size pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    /// Paginate `count` items, `per_page` at a time.
    #[must_use]
    pub const fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            // A zero page size would divide by zero below.
            per_page: if per_page == 0 { 1 } else { per_page },
        }
    }

    /// Number of pages. An empty collection still has one (empty) page.
    #[must_use]
    pub const fn num_pages(&self) -> u64 {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `page` query value to a page number.
    ///
    /// Missing or non-numeric values select the first page. Numbers outside
    /// `1..=num_pages` select the last page.
    #[must_use]
    pub fn resolve(&self, requested: Option<&str>) -> u64 {
        let last = self.num_pages();
        match requested.and_then(parse_page_number) {
            None => 1,
            Some(PageNumber::Exact(number)) if (1..=last).contains(&number) => number,
            Some(_) => last,
        }
    }

    /// Offset of the first item on page `number`.
    #[must_use]
    pub const fn offset(&self, number: u64) -> u64 {
        number.saturating_sub(1) * self.per_page
    }

    /// Items per page.
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Navigation metadata for page `number`.
    #[must_use]
    pub fn meta(&self, number: u64) -> PageMeta {
        let num_pages = self.num_pages();
        let number = number.clamp(1, num_pages);
        let has_next = number < num_pages;
        let has_previous = number > 1;

        let (start_index, end_index) = if self.count == 0 {
            (0, 0)
        } else if number == num_pages {
            (self.offset(number) + 1, self.count)
        } else {
            (self.offset(number) + 1, number * self.per_page)
        };

        PageMeta {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then(|| number - 1),
            start_index,
            end_index,
        }
    }
}

/// A syntactically valid `page` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageNumber {
    Exact(u64),
    /// Negative, or too large to represent. Never a real page.
    OutOfRange,
}

/// An optional sign followed by ASCII digits is a page number, however large;
/// anything else ("abc", "2.0", "") is not.
fn parse_page_number(raw: &str) -> Option<PageNumber> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if negative {
        return Some(PageNumber::OutOfRange);
    }
    Some(
        digits
            .parse::<u64>()
            .map_or(PageNumber::OutOfRange, PageNumber::Exact),
    )
}

/// Navigation metadata rendered alongside a page of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages (at least 1).
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
    /// Page size.
    pub per_page: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_previous: bool,
    /// Number of the next page, if any.
    pub next_page_number: Option<u64>,
    /// Number of the previous page, if any.
    pub previous_page_number: Option<u64>,
    /// 1-based index of the first item on this page (0 when empty).
    pub start_index: u64,
    /// 1-based index of the last item on this page (0 when empty).
    pub end_index: u64,
}

/// One page of items plus its navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page, in feed order.
    pub items: Vec<T>,
    /// Navigation metadata.
    #[serde(flatten)]
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// Transform every item, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
