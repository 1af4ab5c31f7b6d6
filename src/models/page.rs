//! Pagination and sorting
//!
//! `Pageable` describes which slice of a listing to fetch (zero-based page,
//! page size, ordering) and `Page` carries the slice back together with the
//! total row count.
//!
//! Sort keys are a closed enum so that ORDER BY clauses are never built from
//! caller-supplied strings.

use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Sortable post columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Title,
    CreateTime,
    UpdateTime,
    EditTime,
    Visits,
    Likes,
    TopPriority,
}

impl SortField {
    /// Column name in the `posts` table
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::CreateTime => "create_time",
            SortField::UpdateTime => "update_time",
            SortField::EditTime => "edit_time",
            SortField::Visits => "visits",
            SortField::Likes => "likes",
            SortField::TopPriority => "top_priority",
        }
    }
}

/// A single ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub field: SortField,
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

/// Ordering of a listing, most significant term first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(order: Order) -> Self {
        Self {
            orders: vec![order],
        }
    }

    /// Append a less significant term
    pub fn and(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// Render as an ORDER BY clause.
    ///
    /// `id` is appended as the final tie-breaker (in the direction of the
    /// last term) so that paging over equal keys is stable.
    pub fn to_order_by(&self) -> String {
        let mut terms: Vec<String> = self
            .orders
            .iter()
            .map(|o| format!("{} {}", o.field.column(), o.direction.as_sql()))
            .collect();

        if !self.orders.iter().any(|o| o.field == SortField::Id) {
            let direction = self
                .orders
                .last()
                .map_or(Direction::Asc, |o| o.direction);
            terms.push(format!("id {}", direction.as_sql()));
        }

        format!("ORDER BY {}", terms.join(", "))
    }
}

/// Pagination request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    /// Page number (0-indexed)
    pub page: u32,
    /// Number of items per page
    pub size: u32,
    #[serde(default)]
    pub sort: Sort,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            sort: Sort::unsorted(),
        }
    }
}

impl Pageable {
    pub fn of(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: Sort::unsorted(),
        }
    }

    pub fn sorted(page: u32, size: u32, sort: Sort) -> Self {
        Self { page, size, sort }
    }

    /// Row offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    /// Row limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this page
    pub content: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Page number (0-indexed)
    pub page: u32,
    /// Requested page size
    pub size: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, total: u64, pageable: &Pageable) -> Self {
        Self {
            content,
            total,
            page: pageable.page,
            size: pageable.size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Convert the items while keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }
}
