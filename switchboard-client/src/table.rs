//! Sortable, filterable table model
//!
//! [`derive_rows`] computes exactly which rows a table shows and in what
//! order, from the raw collection plus the current controls. It is a pure
//! function of its inputs, so callers may memoize on them.

use std::cmp::Reverse;

use shared::models::{StatusBoardRow, UserRecord};

use crate::time_format::TimeFormatter;

// ============================================================================
// Sort controls
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Active sort key and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K: Copy + Eq> SortState<K> {
    pub fn new(key: K, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Header click: same key toggles direction, another key switches to it ascending
    pub fn click(&mut self, key: K) {
        if self.key == key {
            self.direction = self.direction.toggled();
        } else {
            self.key = key;
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Comparable projection of one field
///
/// Text is compared lowercased; dates as epoch milliseconds. Missing values
/// sort before everything else.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Number(i64),
    Text(String),
}

impl SortValue {
    pub fn text(value: &str) -> Self {
        SortValue::Text(value.to_lowercase())
    }

    pub fn instant(raw: &str, formatter: &TimeFormatter) -> Self {
        formatter
            .parse(raw)
            .map(|dt| SortValue::Number(dt.timestamp_millis()))
            .unwrap_or(SortValue::Missing)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Entity a table can show
pub trait TableRow: Clone {
    type Key: Copy + Eq;

    /// Fields the free-text search looks at
    fn search_fields(&self) -> Vec<&str>;

    fn sort_value(&self, key: Self::Key, formatter: &TimeFormatter) -> SortValue;

    /// Department name, for the department filter and visibility
    fn department(&self) -> &str;

    /// Status name, when the entity has one
    fn status(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSortKey {
    /// Sorted by last name
    Name,
    Department,
    Extension,
    Status,
    UpdatedAt,
}

impl TableRow for StatusBoardRow {
    type Key = BoardSortKey;

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.user_first_name.as_str(),
            self.user_last_name.as_str(),
            self.extension_number.as_str(),
            self.status_name.as_str(),
            self.updated_at.as_str(),
        ]
    }

    fn sort_value(&self, key: BoardSortKey, formatter: &TimeFormatter) -> SortValue {
        match key {
            BoardSortKey::Name => SortValue::text(&self.user_last_name),
            BoardSortKey::Department => SortValue::text(&self.department_name),
            BoardSortKey::Extension => SortValue::text(&self.extension_number),
            BoardSortKey::Status => SortValue::text(&self.status_name),
            BoardSortKey::UpdatedAt => SortValue::instant(&self.updated_at, formatter),
        }
    }

    fn department(&self) -> &str {
        &self.department_name
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortKey {
    FirstName,
    LastName,
    Email,
    Extension,
    Department,
    Role,
    CreatedAt,
}

impl TableRow for UserRecord {
    type Key = UserSortKey;

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
            self.extension.as_str(),
            self.department_name.as_str(),
            self.role.as_str(),
        ]
    }

    fn sort_value(&self, key: UserSortKey, formatter: &TimeFormatter) -> SortValue {
        match key {
            UserSortKey::FirstName => SortValue::text(&self.first_name),
            UserSortKey::LastName => SortValue::text(&self.last_name),
            UserSortKey::Email => SortValue::text(&self.email),
            UserSortKey::Extension => SortValue::text(&self.extension),
            UserSortKey::Department => SortValue::text(&self.department_name),
            UserSortKey::Role => SortValue::text(self.role.as_str()),
            UserSortKey::CreatedAt => SortValue::instant(&self.created_at, formatter),
        }
    }

    fn department(&self) -> &str {
        &self.department_name
    }
}

// ============================================================================
// Query
// ============================================================================

/// Departments hidden from viewers without access to every department
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentVisibility {
    pub restricted: Vec<String>,
    pub can_view_all: bool,
}

impl DepartmentVisibility {
    pub fn new(restricted: Vec<String>, can_view_all: bool) -> Self {
        Self {
            restricted,
            can_view_all,
        }
    }

    /// No restrictions
    pub fn all() -> Self {
        Self {
            restricted: Vec::new(),
            can_view_all: true,
        }
    }

    pub fn allows(&self, department: &str) -> bool {
        self.can_view_all
            || !self
                .restricted
                .iter()
                .any(|r| r.eq_ignore_ascii_case(department.trim()))
    }
}

/// Table controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery<K> {
    pub search: String,
    /// Exact department name
    pub department: Option<String>,
    /// Exact status name; ignored for entities without a status
    pub status: Option<String>,
    pub sort: SortState<K>,
}

impl<K: Copy + Eq> TableQuery<K> {
    pub fn new(sort: SortState<K>) -> Self {
        Self {
            search: String::new(),
            department: None,
            status: None,
            sort,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_department(mut self, department: Option<String>) -> Self {
        self.department = department;
        self
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status;
        self
    }
}

fn matches<R: TableRow>(row: &R, query: &TableQuery<R::Key>, needle: &str) -> bool {
    if let Some(department) = &query.department
        && row.department() != department.as_str()
    {
        return false;
    }
    if let (Some(wanted), Some(status)) = (&query.status, row.status())
        && status != wanted.as_str()
    {
        return false;
    }
    needle.is_empty()
        || row
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
}

/// Visible rows in display order
pub fn derive_rows<R: TableRow>(
    rows: &[R],
    query: &TableQuery<R::Key>,
    visibility: &DepartmentVisibility,
    formatter: &TimeFormatter,
) -> Vec<R> {
    let needle = query.search.trim().to_lowercase();
    let mut visible: Vec<R> = rows
        .iter()
        .filter(|row| visibility.allows(row.department()))
        .filter(|row| matches(*row, query, &needle))
        .cloned()
        .collect();

    let key = query.sort.key;
    match query.sort.direction {
        SortDirection::Ascending => visible.sort_by_cached_key(|row| row.sort_value(key, formatter)),
        SortDirection::Descending => {
            visible.sort_by_cached_key(|row| Reverse(row.sort_value(key, formatter)))
        }
    }
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Role;

    fn formatter() -> TimeFormatter {
        TimeFormatter::new(chrono_tz::UTC)
    }

    fn board_row(id: i64, first: &str, last: &str, dept: &str, status: &str, updated: &str) -> StatusBoardRow {
        StatusBoardRow {
            id,
            user_first_name: first.into(),
            user_last_name: last.into(),
            extension_number: format!("{}", 2200 + id),
            email: format!("{}@example.com", first.to_lowercase()),
            department_name: dept.into(),
            status_name: status.into(),
            note: None,
            updated_at: updated.into(),
        }
    }

    fn board() -> Vec<StatusBoardRow> {
        vec![
            board_row(1, "Thandi", "Nkosi", "Finance", "Available", "2025-05-30 9:05:00"),
            board_row(2, "Pieter", "botha", "Finance", "Lunch", "2025-05-30 10:00:00"),
            board_row(3, "Lerato", "Mokoena", "IT", "Meeting", "2025-05-29 16:45:00"),
            board_row(4, "Ayesha", "Khan", "Sales", "Available", "2025-05-30 08:59:59"),
        ]
    }

    fn ids(rows: &[StatusBoardRow]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    fn query(key: BoardSortKey, direction: SortDirection) -> TableQuery<BoardSortKey> {
        TableQuery::new(SortState::new(key, direction))
    }

    #[test]
    fn test_sort_click_rule() {
        let mut sort = SortState::new(BoardSortKey::UpdatedAt, SortDirection::Descending);
        sort.click(BoardSortKey::UpdatedAt);
        assert_eq!(sort.direction, SortDirection::Ascending);
        sort.click(BoardSortKey::Name);
        assert_eq!(sort, SortState::new(BoardSortKey::Name, SortDirection::Ascending));
        sort.click(BoardSortKey::Name);
        assert_eq!(sort.direction, SortDirection::Descending);
    }

    #[test]
    fn test_text_sort_is_case_insensitive() {
        let rows = derive_rows(&board(), &query(BoardSortKey::Name, SortDirection::Ascending), &DepartmentVisibility::all(), &formatter());
        assert_eq!(ids(&rows), vec![2, 4, 3, 1]);
    }

    #[test]
    fn test_dates_sort_by_instant_not_text() {
        // "2025-05-30 9:05:00" sorts after "2025-05-30 10:00:00" as text
        let rows = derive_rows(&board(), &query(BoardSortKey::UpdatedAt, SortDirection::Ascending), &DepartmentVisibility::all(), &formatter());
        assert_eq!(ids(&rows), vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_sort_is_idempotent_and_toggle_round_trips() {
        let all = DepartmentVisibility::all();
        let asc = query(BoardSortKey::UpdatedAt, SortDirection::Ascending);
        let once = derive_rows(&board(), &asc, &all, &formatter());
        let twice = derive_rows(&once, &asc, &all, &formatter());
        assert_eq!(once, twice);

        let mut toggled = asc.clone();
        toggled.sort.click(BoardSortKey::UpdatedAt);
        let desc = derive_rows(&once, &toggled, &all, &formatter());
        let mut reversed = once.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);

        toggled.sort.click(BoardSortKey::UpdatedAt);
        assert_eq!(derive_rows(&desc, &toggled, &all, &formatter()), once);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let rows = derive_rows(&board(), &query(BoardSortKey::Status, SortDirection::Ascending), &DepartmentVisibility::all(), &formatter());
        assert_eq!(ids(&rows), vec![1, 4, 2, 3]);
        let rows = derive_rows(&board(), &query(BoardSortKey::Status, SortDirection::Descending), &DepartmentVisibility::all(), &formatter());
        assert_eq!(ids(&rows), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_filter_monotonicity() {
        let all = DepartmentVisibility::all();
        let base = query(BoardSortKey::Name, SortDirection::Ascending);
        let unfiltered = derive_rows(&board(), &base, &all, &formatter());
        assert_eq!(unfiltered.len(), 4);
        assert_eq!(derive_rows(&board(), &base.clone().with_search("   "), &all, &formatter()).len(), 4);

        for search in ["a", "AVAIL", "2203", "2025-05-29", "zzz"] {
            let filtered = derive_rows(&board(), &base.clone().with_search(search), &all, &formatter());
            assert!(filtered.iter().all(|r| unfiltered.contains(r)), "{search}");
        }
        let hits = derive_rows(&board(), &base.clone().with_search("AVAIL"), &all, &formatter());
        assert_eq!(ids(&hits), vec![4, 1]);
    }

    #[test]
    fn test_categorical_filters_and_with_search() {
        let all = DepartmentVisibility::all();
        let q = query(BoardSortKey::Name, SortDirection::Ascending)
            .with_department(Some("Finance".into()))
            .with_status(Some("Available".into()));
        assert_eq!(ids(&derive_rows(&board(), &q, &all, &formatter())), vec![1]);

        let q = q.with_status(None).with_search("pieter");
        assert_eq!(ids(&derive_rows(&board(), &q, &all, &formatter())), vec![2]);
    }

    #[test]
    fn test_restricted_department_hidden() {
        let q = query(BoardSortKey::Name, SortDirection::Ascending);
        let restricted = DepartmentVisibility::new(vec!["IT".into()], false);
        let rows = derive_rows(&board(), &q, &restricted, &formatter());
        assert!(rows.iter().all(|r| r.department_name != "IT"));

        let super_view = DepartmentVisibility::new(vec!["IT".into()], true);
        assert_eq!(derive_rows(&board(), &q, &super_view, &formatter()).len(), 4);
    }

    #[test]
    fn test_user_rows() {
        let user = |id: i64, first: &str, role: Role, dept: &str| UserRecord {
            user_id: id,
            first_name: first.into(),
            last_name: "Doe".into(),
            extension: format!("{id}"),
            email: format!("{}@example.com", first.to_lowercase()),
            role,
            department_id: None,
            department_name: dept.into(),
            created_at: format!("2025-01-0{id} 08:00:00"),
            cellphone: None,
            telephone: None,
        };
        let users = vec![
            user(1, "zoe", Role::Admin, "Finance"),
            user(2, "Adam", Role::User, "Sales"),
            user(3, "mia", Role::Operator, "Finance"),
        ];
        let all = DepartmentVisibility::all();

        let q = TableQuery::new(SortState::new(UserSortKey::FirstName, SortDirection::Ascending));
        let names: Vec<String> = derive_rows(&users, &q, &all, &formatter())
            .into_iter()
            .map(|u| u.first_name)
            .collect();
        assert_eq!(names, vec!["Adam", "mia", "zoe"]);

        let q = q.with_search("OPERATOR").with_status(Some("Lunch".into()));
        let hits = derive_rows(&users, &q, &all, &formatter());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_id, 3);

        let q = TableQuery::new(SortState::new(UserSortKey::CreatedAt, SortDirection::Descending));
        let ids: Vec<i64> = derive_rows(&users, &q, &all, &formatter()).iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
