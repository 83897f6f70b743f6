use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Exposes named fields of a record to list filters.
pub trait Filterable {
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Contains { field: String, needle: String },
    Equals { field: String, value: String },
}

impl Predicate {
    pub fn contains(field: &str, needle: &str) -> Self {
        Predicate::Contains {
            field: field.to_string(),
            needle: needle.to_lowercase(),
        }
    }

    pub fn equals(field: &str, value: &str) -> Self {
        Predicate::Equals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Case-insensitive. A record without the field never matches.
    pub fn matches<T: Filterable>(&self, item: &T) -> bool {
        match self {
            Predicate::Contains { field, needle } => item
                .field(field)
                .is_some_and(|value| value.to_lowercase().contains(needle.as_str())),
            Predicate::Equals { field, value } => item
                .field(field)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Filters, then returns one 1-indexed page. `page` is clamped into
/// `1..=total_pages` and `total_pages` is never below 1.
pub fn filter_and_paginate<T, I>(
    items: I,
    predicates: &[Predicate],
    page: usize,
    page_size: usize,
) -> Page<T>
where
    T: Filterable,
    I: IntoIterator<Item = T>,
{
    let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };

    let filtered: Vec<T> = items
        .into_iter()
        .filter(|item| predicates.iter().all(|predicate| predicate.matches(item)))
        .collect();

    let total_items = filtered.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let offset = (page - 1) * page_size;

    let items = filtered
        .into_iter()
        .skip(offset)
        .take(page_size)
        .collect();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub predicates: Vec<Predicate>,
    pub page: usize,
    pub page_size: usize,
}

impl ListParams {
    /// Parses `page`, `page_size` and per-field filters from a query string.
    /// Empty filter values are ignored, unknown fields are rejected.
    pub fn from_query(
        params: &HashMap<String, String>,
        equality_fields: &[&str],
        substring_fields: &[&str],
        default_page_size: usize,
        max_page_size: usize,
    ) -> Result<Self, AppError> {
        let mut page = 1;
        let mut page_size = default_page_size;
        let mut predicates = Vec::new();

        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();

        for key in keys {
            let raw = params[key].trim();
            match key.as_str() {
                "page" => {
                    page = raw
                        .parse::<usize>()
                        .map_err(|err| AppError::BadRequest(format!("invalid page: {err}")))?;
                }
                "page_size" => {
                    page_size = raw
                        .parse::<usize>()
                        .map_err(|err| AppError::BadRequest(format!("invalid page_size: {err}")))?;
                    if page_size == 0 || page_size > max_page_size {
                        return Err(AppError::BadRequest(format!(
                            "page_size must be between 1 and {max_page_size}"
                        )));
                    }
                }
                field if equality_fields.contains(&field) => {
                    if !raw.is_empty() {
                        predicates.push(Predicate::equals(field, raw));
                    }
                }
                field if substring_fields.contains(&field) => {
                    if !raw.is_empty() {
                        predicates.push(Predicate::contains(field, raw));
                    }
                }
                other => {
                    return Err(AppError::BadRequest(format!("unknown filter: {other}")));
                }
            }
        }

        Ok(Self {
            predicates,
            page,
            page_size,
        })
    }

    pub fn apply<T, I>(&self, items: I) -> Page<T>
    where
        T: Filterable,
        I: IntoIterator<Item = T>,
    {
        filter_and_paginate(items, &self.predicates, self.page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::{filter_and_paginate, Filterable, ListParams, Predicate, DEFAULT_PAGE_SIZE};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: String,
        status: String,
    }

    impl Filterable for Row {
        fn field(&self, name: &str) -> Option<Cow<'_, str>> {
            match name {
                "name" => Some(Cow::Borrowed(&self.name)),
                "status" => Some(Cow::Borrowed(&self.status)),
                _ => None,
            }
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row {
                name: format!("Vendor {i}"),
                status: if i % 2 == 0 { "active" } else { "inactive" }.to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_result_is_one_empty_page() {
        let page = filter_and_paginate(rows(5), &[Predicate::contains("name", "nobody")], 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.total_items, 0);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn slices_the_requested_page() {
        let page = filter_and_paginate(rows(25), &[], 3, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].name, "Vendor 20");
    }

    #[test]
    fn page_beyond_the_end_is_clamped() {
        let page = filter_and_paginate(rows(12), &[], 9, 10);
        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 2);

        let page = filter_and_paginate(rows(12), &[], 0, 10);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn contains_is_case_insensitive_and_equals_is_exact() {
        let items = rows(4);
        let page = filter_and_paginate(items.clone(), &[Predicate::contains("name", "VENDOR 3")], 1, 10);
        assert_eq!(page.items.len(), 1);

        let page = filter_and_paginate(items.clone(), &[Predicate::equals("status", "Active")], 1, 10);
        assert_eq!(page.items.len(), 2);

        let page = filter_and_paginate(items, &[Predicate::equals("status", "activ")], 1, 10);
        assert!(page.items.is_empty());
    }

    #[test]
    fn unknown_field_never_matches() {
        let page = filter_and_paginate(rows(3), &[Predicate::contains("email", "")], 1, 10);
        assert_eq!(page.total_items, 0);
    }

    #[test]
    fn query_params_become_predicates() {
        let params: HashMap<String, String> = [
            ("page", "2"),
            ("status", "active"),
            ("name", "ven"),
            ("block", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let parsed =
            ListParams::from_query(&params, &["status", "block"], &["name"], DEFAULT_PAGE_SIZE, 100)
                .unwrap();

        assert_eq!(parsed.page, 2);
        assert_eq!(parsed.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            parsed.predicates,
            vec![Predicate::contains("name", "ven"), Predicate::equals("status", "active")]
        );
    }

    #[test]
    fn unknown_filter_and_oversized_page_are_rejected() {
        let unknown: HashMap<String, String> =
            [("colour".to_string(), "red".to_string())].into_iter().collect();
        assert!(ListParams::from_query(&unknown, &[], &[], 10, 100).is_err());

        let oversized: HashMap<String, String> =
            [("page_size".to_string(), "500".to_string())].into_iter().collect();
        assert!(ListParams::from_query(&oversized, &[], &[], 10, 100).is_err());
    }

    proptest! {
        #[test]
        fn filtering_twice_changes_nothing(n in 0usize..60, needle in "[0-9]{0,2}") {
            let predicates = vec![Predicate::contains("name", &needle)];
            let once = filter_and_paginate(rows(n), &predicates, 1, usize::MAX);
            let twice = filter_and_paginate(once.items.clone(), &predicates, 1, usize::MAX);
            prop_assert_eq!(once.items, twice.items);
        }

        #[test]
        fn pages_cover_every_match_exactly_once(n in 0usize..60, page_size in 1usize..15) {
            let first = filter_and_paginate(rows(n), &[], 1, page_size);
            let mut seen = Vec::new();
            for page in 1..=first.total_pages {
                seen.extend(filter_and_paginate(rows(n), &[], page, page_size).items);
            }
            prop_assert_eq!(seen, rows(n));
        }
    }
}
