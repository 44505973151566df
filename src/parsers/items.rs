//! Line-item recovery from the `tbody#myTable` purchase table.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::clean_text;
use super::number::{parse_decimal, NumberProfile};
use crate::error::FieldError;
use crate::models::ItemInvoice;

/// Cells an item row must have: description+code, quantity, unit, value.
const ITEM_CELLS: usize = 4;

static ITEM_ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tbody#myTable > tr").expect("Invalid item row selector")
});

static DESCRIPTION_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(.*?)\s*\(\s*C[óo]digo:\s*(\d+)\s*\)").expect("Invalid description regex")
});

static QUANTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Qtde\.?\s+total\s+de\s+[íi]tens:\s*([\d.,]+)").expect("Invalid quantity regex")
});

static UNIT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bUN\.?:\s*(\w+)").expect("Invalid unit regex")
});

static VALUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Valor\s+total\s+R\$:\s*(?:R\$)?\s*([\d.,]+)").expect("Invalid value regex")
});

/// Extract purchased items in page order.
///
/// Rows that do not have exactly four cells, or whose cells do not all match,
/// are skipped. A page without the item table yields an empty list.
pub fn extract_items(page: &str) -> Vec<ItemInvoice> {
    let document = Html::parse_document(page);
    let mut items = Vec::new();

    for (index, row) in document.select(&ITEM_ROW_SELECTOR).enumerate() {
        let cells = row_cells(row);
        if cells.len() != ITEM_CELLS {
            debug!("Skipping item row {}: {} cells", index + 1, cells.len());
            continue;
        }

        match parse_item_cells(&cells) {
            Ok(item) => items.push(item),
            Err(e @ FieldError::PatternNotFound { .. }) => {
                debug!("Skipping item row {}: {}", index + 1, e)
            }
            Err(e) => warn!("Dropping item row {}: {}", index + 1, e),
        }
    }

    debug!("Extracted {} items", items.len());
    items
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .map(|cell| clean_text(&cell.text().collect::<Vec<_>>().join(" ")))
        .collect()
}

fn capture<'t>(pattern: &Regex, text: &'t str, field: &'static str) -> Result<regex::Captures<'t>, FieldError> {
    pattern
        .captures(text)
        .ok_or(FieldError::PatternNotFound { field })
}

/// Build one item from the four cell texts; all-or-nothing.
pub fn parse_item_cells(cells: &[String]) -> Result<ItemInvoice, FieldError> {
    let [description_cell, quantity_cell, unit_cell, value_cell] = cells else {
        return Err(FieldError::PatternNotFound { field: "item_row" });
    };

    let description_caps = capture(&DESCRIPTION_CODE_REGEX, description_cell, "description")?;
    let quantity_caps = capture(&QUANTITY_REGEX, quantity_cell, "quantity")?;
    let unit_caps = capture(&UNIT_REGEX, unit_cell, "unit")?;
    let value_caps = capture(&VALUE_REGEX, value_cell, "value")?;

    Ok(ItemInvoice {
        code: description_caps[2].to_string(),
        description: description_caps[1].trim().to_string(),
        quantity: parse_decimal(&quantity_caps[1], NumberProfile::BRAZILIAN)?,
        unit: unit_caps[1].to_string(),
        value: parse_decimal(&value_caps[1], NumberProfile::BRAZILIAN)?,
    })
}
