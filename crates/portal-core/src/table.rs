//! Applications table view
//!
//! Renders exactly the columns the service names, in the order given, with
//! global filtering, single-column sorting, column hiding and pagination.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::error::{FormError, Result};
use crate::service::{ApplicationRecord, ApplicationsPage};
use crate::values;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One page of the table, cells already converted to text
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Zero based
    pub page: usize,
    pub page_count: usize,
    /// Rows matching the filter, across all pages
    pub total_rows: usize,
}

#[derive(Clone, Debug)]
pub struct TableView {
    columns: Vec<String>,
    rows: Vec<ApplicationRecord>,
    hidden: HashSet<String>,
    sort: Option<(String, SortDirection)>,
    filter: String,
    page: usize,
    page_size: usize,
}

impl TableView {
    pub fn new(page: ApplicationsPage) -> Self {
        Self {
            columns: page.columns,
            rows: page.data,
            hidden: HashSet::new(),
            sort: None,
            filter: String::new(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn require_column(&self, column: &str) -> Result<()> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(FormError::UnknownColumn(column.to_string()))
        }
    }

    pub fn sort_by(&mut self, column: &str, direction: SortDirection) -> Result<()> {
        self.require_column(column)?;
        self.sort = Some((column.to_string(), direction));
        Ok(())
    }

    /// Case-insensitive substring match against any visible cell.
    /// Resets to the first page.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter = text.into().trim().to_lowercase();
        self.page = 0;
    }

    pub fn set_column_visible(&mut self, column: &str, visible: bool) -> Result<()> {
        self.require_column(column)?;
        if visible {
            self.hidden.remove(column);
        } else {
            self.hidden.insert(column.to_string());
        }
        Ok(())
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size.max(1);
        self.page = 0;
    }

    /// Jump to a page; out of range indexes clamp to the last page
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    fn visible_columns(&self) -> Vec<&String> {
        self.columns.iter().filter(|c| !self.hidden.contains(*c)).collect()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let columns = self.visible_columns();

        let mut matching: Vec<&ApplicationRecord> = self
            .rows
            .iter()
            .filter(|row| {
                self.filter.is_empty()
                    || columns.iter().any(|c| {
                        row.get(c.as_str())
                            .map(|v| values::display(v).to_lowercase().contains(&self.filter))
                            .unwrap_or(false)
                    })
            })
            .collect();

        if let Some((column, direction)) = &self.sort {
            matching.sort_by(|a, b| {
                let ordering = compare_cells(a.get(column), b.get(column));
                match (direction, is_null(a.get(column)), is_null(b.get(column))) {
                    // nulls stay last in either direction
                    (_, true, false) | (_, false, true) => ordering,
                    (SortDirection::Desc, _, _) => ordering.reverse(),
                    (SortDirection::Asc, _, _) => ordering,
                }
            });
        }

        let total_rows = matching.len();
        let page_count = total_rows.div_ceil(self.page_size).max(1);
        let page = self.page.min(page_count - 1);

        let rows = matching
            .into_iter()
            .skip(page * self.page_size)
            .take(self.page_size)
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c.as_str()).map(values::display).unwrap_or_default())
                    .collect()
            })
            .collect();

        TableSnapshot {
            headers: columns.into_iter().cloned().collect(),
            rows,
            page,
            page_count,
            total_rows,
        }
    }
}

fn is_null(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Numbers numerically and ahead of text, text case-insensitively, missing
/// values last
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (is_null(a), is_null(b)) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    let (a, b) = (a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null));
    // numbers rank before text so mixed columns still sort consistently
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => values::display(a).to_lowercase().cmp(&values::display(b).to_lowercase()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> ApplicationsPage {
        serde_json::from_value(json!({
            "columns": ["Full Name", "Age", "Insurance Type", "City"],
            "data": [
                { "id": "1", "Full Name": "John Doe", "Age": 28, "Insurance Type": "Health", "City": "New York" },
                { "id": "2", "Full Name": "jane smith", "Age": 32, "Insurance Type": "Home", "City": "Los Angeles" },
                { "id": "3", "Full Name": "Alice Brown", "Age": 5, "Insurance Type": "Car", "City": null },
                { "id": "4", "Full Name": "Bob White", "Insurance Type": "Home", "City": "Chicago" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_columns_in_server_order() {
        let snapshot = TableView::new(page()).snapshot();
        assert_eq!(snapshot.headers, vec!["Full Name", "Age", "Insurance Type", "City"]);
        assert_eq!(snapshot.rows[0], vec!["John Doe", "28", "Health", "New York"]);
        assert_eq!(snapshot.total_rows, 4);
        assert_eq!(snapshot.page_count, 1);
    }

    #[test]
    fn test_sort_numeric_nulls_last() {
        let mut view = TableView::new(page());
        view.sort_by("Age", SortDirection::Asc).unwrap();
        let names: Vec<_> = view.snapshot().rows.into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(names, vec!["Alice Brown", "John Doe", "jane smith", "Bob White"]);

        view.sort_by("Age", SortDirection::Desc).unwrap();
        let names: Vec<_> = view.snapshot().rows.into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(names, vec!["jane smith", "John Doe", "Alice Brown", "Bob White"]);
    }

    #[test]
    fn test_sort_mixed_column_numbers_first() {
        let page: ApplicationsPage = serde_json::from_value(json!({
            "columns": ["Policy"],
            "data": [ { "Policy": "abc" }, { "Policy": 10 }, { "Policy": "1a" }, { "Policy": 9 }, { "Policy": null } ]
        }))
        .unwrap();
        let mut view = TableView::new(page);
        view.sort_by("Policy", SortDirection::Asc).unwrap();
        let cells: Vec<_> = view.snapshot().rows.into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(cells, vec!["9", "10", "1a", "abc", ""]);

        view.sort_by("Policy", SortDirection::Desc).unwrap();
        let cells: Vec<_> = view.snapshot().rows.into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(cells, vec!["abc", "1a", "10", "9", ""]);
    }

    #[test]
    fn test_sort_text_case_insensitive() {
        let mut view = TableView::new(page());
        view.sort_by("Full Name", SortDirection::Asc).unwrap();
        let names: Vec<_> = view.snapshot().rows.into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(names, vec!["Alice Brown", "Bob White", "jane smith", "John Doe"]);
    }

    #[test]
    fn test_global_filter_visible_columns_only() {
        let mut view = TableView::new(page());
        view.set_filter("HOME");
        assert_eq!(view.snapshot().total_rows, 2);

        view.set_column_visible("Insurance Type", false).unwrap();
        let snapshot = view.snapshot();
        assert_eq!(snapshot.total_rows, 0);
        assert_eq!(snapshot.headers, vec!["Full Name", "Age", "City"]);
    }

    #[test]
    fn test_pagination_clamps() {
        let mut view = TableView::new(page());
        view.set_page_size(3);
        assert_eq!(view.snapshot().page_count, 2);
        view.set_page(1);
        assert_eq!(view.snapshot().rows.len(), 1);
        view.set_page(9);
        let snapshot = view.snapshot();
        assert_eq!(snapshot.page, 1);
        assert_eq!(snapshot.rows.len(), 1);
    }

    #[test]
    fn test_unknown_column() {
        let mut view = TableView::new(page());
        assert!(matches!(view.sort_by("Premium", SortDirection::Asc), Err(FormError::UnknownColumn(_))));
        assert!(view.set_column_visible("id", false).is_err());
    }

    #[test]
    fn test_empty_page() {
        let snapshot = TableView::new(ApplicationsPage::default()).snapshot();
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.page_count, 1);
        assert_eq!(snapshot.page, 0);
    }
}
