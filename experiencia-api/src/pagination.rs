//! Pagination utilities
//!
//! Request side: `page` (0-indexed), `size` and repeated `sort=field,dir`
//! query parameters parsed into a [`Pageable`]. Response side: a [`Page`] of
//! results plus `X-Total-Count` and `Link` navigation headers.

use axum::http::{header, HeaderMap, HeaderValue, Uri};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Page size used when the request gives none
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 2000;

/// Highest page number accepted; keeps `page * size` within `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE - 1;

/// Total number of matching rows across all pages
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Sortable properties of an experiencia
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Titulo,
    Descripcion,
    Localizacion,
    Fecha,
}

impl SortField {
    /// Column name; identical in the primary store and the search index
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Titulo => "titulo",
            SortField::Descripcion => "descripcion",
            SortField::Localizacion => "localizacion",
            SortField::Fecha => "fecha",
        }
    }
}

impl FromStr for SortField {
    type Err = PageableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "titulo" => Ok(SortField::Titulo),
            "descripcion" => Ok(SortField::Descripcion),
            "localizacion" => Ok(SortField::Localizacion),
            "fecha" => Ok(SortField::Fecha),
            other => Err(PageableError::InvalidSortProperty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub field: SortField,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageableError {
    InvalidSortProperty(String),
}

impl fmt::Display for PageableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageableError::InvalidSortProperty(p) => write!(f, "Invalid sort property: {}", p),
        }
    }
}

impl std::error::Error for PageableError {}

/// Requested page: number, size and sort order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pageable {
    pub page: i64,
    pub size: i64,
    pub sort: Vec<Order>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
        }
    }
}

impl Pageable {
    /// Unsorted page `page` of `size` rows
    pub fn of(page: i64, size: i64) -> Self {
        Self {
            page: page.clamp(0, MAX_PAGE),
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort: Vec::new(),
        }
    }

    pub fn sorted_by(mut self, field: SortField, direction: Direction) -> Self {
        self.sort.push(Order { field, direction });
        self
    }

    /// Build from decoded query pairs
    ///
    /// Unparseable `page`/`size` values fall back to the defaults; `size` is
    /// capped at [`MAX_PAGE_SIZE`]. Each `sort` value is `prop[,prop...][,dir]`
    /// where a trailing direction applies to every property before it.
    /// Unknown properties are rejected.
    pub fn from_query(params: &[(String, String)]) -> Result<Self, PageableError> {
        let mut pageable = Pageable::default();

        for (key, value) in params {
            match key.as_str() {
                "page" => {
                    if let Ok(page) = value.trim().parse::<i64>() {
                        pageable.page = page.clamp(0, MAX_PAGE);
                    }
                }
                "size" => {
                    if let Ok(size) = value.trim().parse::<i64>() {
                        if size >= 1 {
                            pageable.size = size.min(MAX_PAGE_SIZE);
                        }
                    }
                }
                "sort" => pageable.sort.extend(parse_sort(value)?),
                _ => {}
            }
        }

        Ok(pageable)
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    /// ORDER BY body built only from whitelisted columns
    ///
    /// `id` is appended as a tie-breaker so paging is deterministic.
    pub fn order_by(&self) -> String {
        let mut parts: Vec<String> = self
            .sort
            .iter()
            .map(|o| format!("{} {}", o.field.column(), o.direction.sql()))
            .collect();

        if !self.sort.iter().any(|o| o.field == SortField::Id) {
            parts.push("id ASC".to_string());
        }

        parts.join(", ")
    }
}

fn parse_sort(value: &str) -> Result<Vec<Order>, PageableError> {
    let mut parts: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let direction = match parts.last().and_then(|last| Direction::parse(last)) {
        Some(d) => {
            parts.pop();
            d
        }
        None => Direction::Asc,
    };

    parts
        .into_iter()
        .map(|p| {
            Ok(Order {
                field: p.parse()?,
                direction,
            })
        })
        .collect()
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Page number (0-indexed)
    pub number: i64,
    pub size: i64,
    pub total_elements: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: i64) -> Self {
        Self {
            content,
            number: pageable.page,
            size: pageable.size,
            total_elements,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.size <= 0 {
            1
        } else {
            (self.total_elements + self.size - 1) / self.size
        }
    }

    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }
}

/// `X-Total-Count` and `Link` headers for a page
///
/// Links reuse the request path and every query parameter except `page` and
/// `size`, which are replaced. `next`/`prev` appear only when such a page
/// exists; `last` and `first` are always present.
pub fn pagination_headers<T>(uri: &Uri, page: &Page<T>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(page.total_elements));

    let mut links = Vec::with_capacity(4);
    if page.has_next() {
        links.push(prepare_link(uri, page.number + 1, page.size, "next"));
    }
    if page.has_previous() {
        links.push(prepare_link(uri, page.number - 1, page.size, "prev"));
    }
    let last_page = (page.total_pages() - 1).max(0);
    links.push(prepare_link(uri, last_page, page.size, "last"));
    links.push(prepare_link(uri, 0, page.size, "first"));

    if let Ok(value) = HeaderValue::from_str(&links.join(",")) {
        headers.insert(header::LINK, value);
    }

    headers
}

fn prepare_link(uri: &Uri, page: i64, size: i64, rel: &str) -> String {
    let mut query: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            key != "page" && key != "size"
        })
        .map(str::to_string)
        .collect();
    query.push(format!("page={}", page));
    query.push(format!("size={}", size));

    let target = format!("{}?{}", uri.path(), query.join("&"))
        .replace(',', "%2C")
        .replace(';', "%3B");

    format!("<{}>; rel=\"{}\"", target, rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let p = Pageable::from_query(&[]).unwrap();
        assert_eq!(p.page, 0);
        assert_eq!(p.size, DEFAULT_PAGE_SIZE);
        assert!(p.sort.is_empty());
        assert_eq!(p.order_by(), "id ASC");
    }

    #[test]
    fn test_page_and_size() {
        let p = Pageable::from_query(&params(&[("page", "3"), ("size", "10")])).unwrap();
        assert_eq!(p.page, 3);
        assert_eq!(p.size, 10);
        assert_eq!(p.offset(), 30);
    }

    #[test]
    fn test_out_of_range_values() {
        let p = Pageable::from_query(&params(&[("page", "-2"), ("size", "0")])).unwrap();
        assert_eq!(p.page, 0);
        assert_eq!(p.size, DEFAULT_PAGE_SIZE);

        let p = Pageable::from_query(&params(&[("size", "999999"), ("page", "abc")])).unwrap();
        assert_eq!(p.size, MAX_PAGE_SIZE);
        assert_eq!(p.page, 0);
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let huge = i64::MAX.to_string();
        let p = Pageable::from_query(&params(&[("page", huge.as_str()), ("size", "20")])).unwrap();
        assert_eq!(p.page, MAX_PAGE);
        assert!(p.offset() > 0);

        let p = Pageable::from_query(&params(&[("page", huge.as_str()), ("size", "2000")])).unwrap();
        assert_eq!(p.offset(), MAX_PAGE * MAX_PAGE_SIZE);

        let uri: Uri = format!("/api/experiencias?page={}", huge).parse().unwrap();
        let page: Page<i32> = Page::new(vec![], &p, 3);
        assert!(!page.has_next());
        assert!(page.has_previous());
        let headers = pagination_headers(&uri, &page);
        let link = headers["Link"].to_str().unwrap();
        assert!(link.contains(&format!("page={}&size=2000>; rel=\"prev\"", MAX_PAGE - 1)));
    }

    #[test]
    fn test_sort_parsing() {
        let p = Pageable::from_query(&params(&[("sort", "id,desc")])).unwrap();
        assert_eq!(
            p.sort,
            vec![Order {
                field: SortField::Id,
                direction: Direction::Desc
            }]
        );
        assert_eq!(p.order_by(), "id DESC");

        let p = Pageable::from_query(&params(&[("sort", "fecha"), ("sort", "titulo,desc")])).unwrap();
        assert_eq!(p.order_by(), "fecha ASC, titulo DESC, id ASC");
    }

    #[test]
    fn test_trailing_direction_applies_to_all_properties() {
        let p = Pageable::from_query(&params(&[("sort", "titulo,fecha,desc")])).unwrap();
        assert_eq!(p.order_by(), "titulo DESC, fecha DESC, id ASC");
    }

    #[test]
    fn test_unknown_sort_property_rejected() {
        let err = Pageable::from_query(&params(&[("sort", "password,asc")])).unwrap_err();
        assert_eq!(err, PageableError::InvalidSortProperty("password".to_string()));
    }

    #[test]
    fn test_total_pages() {
        let pageable = Pageable::of(0, 20);
        assert_eq!(Page::<i32>::new(vec![], &pageable, 0).total_pages(), 0);
        assert_eq!(Page::<i32>::new(vec![], &pageable, 20).total_pages(), 1);
        assert_eq!(Page::<i32>::new(vec![], &pageable, 41).total_pages(), 3);
    }

    #[test]
    fn test_link_header_middle_page() {
        let uri: Uri = "/api/experiencias?page=1&size=10&sort=id,desc".parse().unwrap();
        let page = Page::new(vec![0; 10], &Pageable::of(1, 10), 35);

        let headers = pagination_headers(&uri, &page);
        assert_eq!(headers["X-Total-Count"], "35");

        let link = headers["Link"].to_str().unwrap();
        assert_eq!(
            link,
            "</api/experiencias?sort=id%2Cdesc&page=2&size=10>; rel=\"next\",\
             </api/experiencias?sort=id%2Cdesc&page=0&size=10>; rel=\"prev\",\
             </api/experiencias?sort=id%2Cdesc&page=3&size=10>; rel=\"last\",\
             </api/experiencias?sort=id%2Cdesc&page=0&size=10>; rel=\"first\""
        );
    }

    #[test]
    fn test_link_header_empty_result() {
        let uri: Uri = "/api/_search/experiencias?query=nothing".parse().unwrap();
        let page: Page<i32> = Page::new(vec![], &Pageable::default(), 0);

        let headers = pagination_headers(&uri, &page);
        assert_eq!(headers["X-Total-Count"], "0");

        let link = headers["Link"].to_str().unwrap();
        assert!(!link.contains("rel=\"next\""));
        assert!(!link.contains("rel=\"prev\""));
        assert!(link.contains("</api/_search/experiencias?query=nothing&page=0&size=20>; rel=\"last\""));
        assert!(link.contains("rel=\"first\""));
    }
}
