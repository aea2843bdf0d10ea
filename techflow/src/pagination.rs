//! Page-number windows for paginated lists.

use std::fmt;

/// Page counts up to this are shown in full.
const MAX_VISIBLE: u32 = 5;

/// One entry of a pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    /// A page number.
    Page(u32),
    /// A gap of one or more hidden pages.
    Ellipsis,
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

/// Page numbers to show for `current` out of `total`.
///
/// - `total <= 1`: nothing.
/// - `total <= 5`: every page.
/// - Otherwise the first page, a three-page window, and the last page, with
///   an ellipsis wherever pages are skipped. The window is `2..=4` near the
///   start, `total-3..=total-1` near the end, and `current-1..=current+1`
///   elsewhere.
#[must_use]
pub fn page_window(current: u32, total: u32) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    if total <= MAX_VISIBLE {
        return (1..=total).map(PageItem::Page).collect();
    }

    let (start, end) = if current >= total - 2 {
        (total - 3, total - 1)
    } else if current <= 3 {
        (2, 4)
    } else {
        (current - 1, current + 1)
    };

    let mut items = vec![PageItem::Page(1)];
    if start > 2 {
        items.push(PageItem::Ellipsis);
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < total - 1 {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::Page(total));
    items
}

/// 1-based numbers of the first and last item shown on `current`.
///
/// Returns `(0, 0)` when there are no items.
#[must_use]
pub fn showing_range(current: u32, per_page: u32, total_items: u64) -> (u64, u64) {
    if total_items == 0 || per_page == 0 {
        return (0, 0);
    }
    let current = u64::from(current.max(1));
    let per_page = u64::from(per_page);
    let first = ((current - 1) * per_page + 1).min(total_items);
    let last = (current * per_page).min(total_items);
    (first, last)
}

/// Renders a window as `1 ... 4 [5] 6 ... 10`.
#[must_use]
pub fn render_window(current: u32, total: u32) -> String {
    page_window(current, total)
        .iter()
        .map(|item| match item {
            PageItem::Page(n) if *n == current => format!("[{n}]"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
