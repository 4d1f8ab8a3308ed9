//! Applications table command

use anyhow::{bail, Context as _, Result};
use portal_core::{FormService, SortDirection, TableSnapshot, TableView};

use super::Context;
use crate::output::{self, OutputFormat};
use crate::ApplicationsArgs;

pub async fn handle(args: ApplicationsArgs, ctx: &Context) -> Result<()> {
    let page = ctx.service.fetch_submissions().await.context("could not load applications")?;
    tracing::debug!(rows = page.data.len(), columns = page.columns.len(), "loaded applications");

    let mut view = TableView::new(page);
    let columns = view.columns().join(", ");
    let known = || format!("available columns: {}", columns);
    if let Some(sort) = &args.sort {
        let (column, direction) = parse_sort(sort)?;
        view.sort_by(column, direction).with_context(known)?;
    }
    for column in &args.hide {
        view.set_column_visible(column, false).with_context(known)?;
    }
    if let Some(filter) = &args.filter {
        view.set_filter(filter.as_str());
    }
    if let Some(size) = args.page_size.or(ctx.page_size) {
        view.set_page_size(size);
    }
    view.set_page(args.page.saturating_sub(1));

    let snapshot = view.snapshot();
    match ctx.format {
        OutputFormat::Table => print_table(&snapshot),
        format => format.print(&snapshot)?,
    }
    Ok(())
}

/// Parse `COLUMN`, `COLUMN:asc` or `COLUMN:desc`
pub fn parse_sort(sort: &str) -> Result<(&str, SortDirection)> {
    let (column, direction) = match sort.rsplit_once(':') {
        Some((column, "asc")) => (column, SortDirection::Asc),
        Some((column, "desc")) => (column, SortDirection::Desc),
        Some((_, other)) => bail!("sort direction must be asc or desc, got {:?}", other),
        None => (sort, SortDirection::Asc),
    };
    if column.is_empty() {
        bail!("sort column is empty");
    }
    Ok((column, direction))
}

fn print_table(snapshot: &TableSnapshot) {
    if snapshot.total_rows == 0 {
        output::notice("No applications found");
        return;
    }
    println!("{}", output::table(snapshot.headers.clone(), snapshot.rows.clone()));
    println!(
        "Page {} of {} ({} applications)",
        snapshot.page + 1,
        snapshot.page_count,
        snapshot.total_rows
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("Age").unwrap(), ("Age", SortDirection::Asc));
        assert_eq!(parse_sort("Age:desc").unwrap(), ("Age", SortDirection::Desc));
        assert_eq!(parse_sort("Insurance Type:asc").unwrap(), ("Insurance Type", SortDirection::Asc));
    }

    #[test]
    fn test_parse_sort_rejects_bad_direction() {
        assert!(parse_sort("Age:down").is_err());
        assert!(parse_sort(":desc").is_err());
    }
}
