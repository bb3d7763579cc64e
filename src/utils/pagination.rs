use serde::{Deserialize, Serialize};

use crate::error::{AppResult, DBError};

pub const PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page number accepted; keeps `offset()` from overflowing.
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `base` is the absolute URL of the listing with its original query string; the
    /// `page` parameter in it is replaced for the `next`/`previous` links.
    pub fn new(results: Vec<T>, count: i64, query: &PageQuery, base: &str) -> AppResult<Self> {
        let page = query.page();
        if page > 1 && query.offset() >= count {
            return Err(DBError::NotFound("Invalid page").into());
        }

        let next = (query.offset() + query.limit() < count).then(|| page_link(base, page + 1));
        let previous = (page > 1).then(|| page_link(base, page - 1));

        Ok(Self {
            count,
            next,
            previous,
            results,
        })
    }
}

fn page_link(base: &str, page: i64) -> String {
    let (path, query) = base.split_once('?').unwrap_or((base, ""));

    let mut params = query
        .split('&')
        .filter(|param| !param.is_empty() && !param.starts_with("page="))
        .map(str::to_string)
        .collect::<Vec<String>>();
    if page > 1 {
        params.push(format!("page={page}"));
    }

    if params.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", params.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<i64>, limit: Option<i64>) -> PageQuery {
        PageQuery { page, limit }
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(query(None, None).limit(), PAGE_SIZE);
        assert_eq!(query(None, Some(0)).limit(), 1);
        assert_eq!(query(None, Some(1000)).limit(), MAX_PAGE_SIZE);
        assert_eq!(query(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn links_keep_other_parameters() {
        let base = "http://localhost/api/recipes/?author=2&page=2&limit=2";
        let page = Page::new(vec![1, 2], 7, &query(Some(2), Some(2)), base).unwrap();

        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost/api/recipes/?author=2&limit=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://localhost/api/recipes/?author=2&limit=2")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::new(vec![1], 1, &query(None, None), "http://localhost/api/users/").unwrap();

        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        assert!(Page::<i32>::new(vec![], 3, &query(Some(2), Some(6)), "http://x/").is_err());
        assert!(Page::<i32>::new(vec![], 0, &query(Some(1), None), "http://x/").is_ok());
    }

    #[test]
    fn huge_page_number_is_not_found() {
        let huge = query(Some(i64::MAX), Some(MAX_PAGE_SIZE));

        assert!(huge.offset() > 0);
        assert!(Page::<i32>::new(vec![], 10, &huge, "http://x/").is_err());
        assert!(Page::<i32>::new(vec![], 10, &query(Some(i64::MIN), None), "http://x/").is_ok());
    }
}
