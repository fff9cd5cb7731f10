use std::cmp::Ordering;

use serde::Serialize;

pub const PAGE_SIZE: usize = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Case-insensitive substring match of `query` against any of `fields`.
/// An empty query matches everything.
pub fn matches_query(fields: &[&str], query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = fold_case(query);
    fields.iter().any(|f| fold_case(f).contains(&needle))
}

// Per-char lowering keeps a prefix of the query folding to a prefix.
fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

pub fn filter_records<'a, R, F>(records: &'a [R], query: &str, fields: F) -> Vec<&'a R>
where
    F: Fn(&'a R) -> Vec<&'a str>,
{
    records
        .iter()
        .filter(|&r| matches_query(&fields(r), query))
        .collect()
}

/// Stable sort by a numeric key. Rows without a key go last in both orders.
pub fn sort_by_rank<R, K>(records: &mut [&R], order: SortOrder, key: K)
where
    K: Fn(&R) -> Option<u64>,
{
    records.sort_by(|a, b| match (key(a), key(b)) {
        (Some(x), Some(y)) => match order {
            SortOrder::Asc => x.cmp(&y),
            SortOrder::Desc => y.cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// `ceil(total / page_size)`.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Clamps a 1-based page number into the valid range for `total` items.
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    page.clamp(1, page_count(total, page_size).max(1))
}

/// The 1-based `page` window of `items`. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// 1-based index of the first item on the page, 0 when empty.
    pub first: usize,
    pub last: usize,
    pub items: Vec<T>,
}

impl<T: Clone> Page<T> {
    pub fn build(filtered: &[T], page: usize, page_size: usize) -> Self {
        let number = clamp_page(page, filtered.len(), page_size);
        let items = paginate(filtered, number, page_size).to_vec();
        let first = if items.is_empty() {
            0
        } else {
            (number - 1) * page_size + 1
        };
        let last = if items.is_empty() {
            0
        } else {
            first + items.len() - 1
        };
        Self {
            number,
            total_pages: page_count(filtered.len(), page_size),
            total_items: filtered.len(),
            first,
            last,
            items,
        }
    }
}
