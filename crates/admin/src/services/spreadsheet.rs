//! Excel rendering of shopping lists and pick sheets.
//!
//! Workbooks are built in memory and returned as xlsx bytes.

use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use vega_core::OrderStatus;

use crate::models::{OrderWithLines, ShoppingList};

/// MIME type of xlsx downloads.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const SHOPPING_LIST_SHEET: &str = "Lista de Compras";
pub const PICK_LIST_SHEET: &str = "Pedidos para Armar";

const HEADER_FILL: u32 = 0x002E_5C46;
const GROUP_FILL: u32 = 0x00E8_F5E9;
const POSTPONED_FILL: u32 = 0x00FF_F3E0;
const CHECKBOX: &str = "☐";

/// Errors that can occur while building a workbook.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
}

/// White bold text on the brand green, with thin borders.
pub(crate) fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin)
}

fn title_format() -> Format {
    Format::new().set_bold().set_font_size(14)
}

fn group_format(fill: u32) -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(fill))
}

fn cell_format() -> Format {
    Format::new().set_border(FormatBorder::Thin)
}

fn centered_cell_format() -> Format {
    cell_format().set_align(FormatAlign::Center)
}

#[allow(clippy::cast_precision_loss)]
fn quantity_cell(quantity: i64) -> f64 {
    quantity as f64
}

/// Download filename of a shopping list.
#[must_use]
pub fn shopping_list_filename(date: NaiveDate) -> String {
    format!("lista_compras_{date}.xlsx")
}

/// Download filename of a pick sheet.
#[must_use]
pub fn pick_list_filename(date: NaiveDate) -> String {
    format!("pedidos_armado_{date}.xlsx")
}

/// Render a shopping list: one bold band per category followed by its
/// products, each with a quantity and an empty checkbox.
///
/// # Errors
///
/// Returns `SpreadsheetError::Xlsx` if the workbook cannot be written.
pub fn render_shopping_list(
    date: NaiveDate,
    list: &ShoppingList,
) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHOPPING_LIST_SHEET)?;

    sheet.merge_range(
        0,
        0,
        0,
        2,
        &format!("Lista de Compras - {date}"),
        &title_format().set_align(FormatAlign::Center),
    )?;

    let header = header_format().set_align(FormatAlign::Center);
    for (col, title) in (0u16..).zip(["Producto", "Cantidad", "✓"]) {
        sheet.write_string_with_format(2, col, title, &header)?;
    }

    let band = group_format(GROUP_FILL);
    let cell = cell_format();
    let centered = centered_cell_format();

    let mut row: u32 = 3;
    for group in &list.groups {
        sheet.merge_range(row, 0, row, 2, &group.category, &band)?;
        row += 1;

        for item in &group.items {
            sheet.write_string_with_format(row, 0, &item.product, &cell)?;
            sheet.write_number_with_format(row, 1, quantity_cell(item.quantity), &centered)?;
            sheet.write_string_with_format(row, 2, CHECKBOX, &centered)?;
            row += 1;
        }
    }

    set_widths(sheet, [50.0, 12.0, 8.0])?;
    Ok(workbook.save_to_buffer()?)
}

/// Render a pick sheet: one block per order with its header, address and
/// line items. Postponed orders are flagged and highlighted.
///
/// # Errors
///
/// Returns `SpreadsheetError::Xlsx` if the workbook cannot be written.
pub fn render_pick_list(
    date: NaiveDate,
    orders: &[OrderWithLines],
) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(PICK_LIST_SHEET)?;

    sheet.merge_range(
        0,
        0,
        0,
        2,
        &format!("Pedidos para Armar - {date}"),
        &title_format(),
    )?;
    sheet.write_string(1, 0, format!("Total: {} pedidos", orders.len()))?;

    let header = header_format();
    let active_band = group_format(GROUP_FILL);
    let postponed_band = group_format(POSTPONED_FILL);
    let cell = cell_format();
    let centered = centered_cell_format();

    let mut row: u32 = 3;
    for entry in orders {
        let order = &entry.order;
        let postponed = order.status == OrderStatus::Postponed;

        let title = format!(
            "{} | {} | {}{}",
            order.order_number,
            order.customer_name.as_deref().unwrap_or_default(),
            order.delivery_zone.as_deref().unwrap_or_default(),
            if postponed { " [POSTERGADO]" } else { "" },
        );
        let band = if postponed { &postponed_band } else { &active_band };
        sheet.merge_range(row, 0, row, 2, &title, band)?;
        row += 1;

        if let Some(address) = order.address.as_deref().filter(|a| !a.is_empty()) {
            sheet.write_string(row, 0, format!("📍 {address}"))?;
            row += 1;
        }

        for (col, title) in (0u16..).zip(["Producto", "Cant.", "✓"]) {
            sheet.write_string_with_format(row, col, title, &header)?;
        }
        row += 1;

        for line in &entry.lines {
            sheet.write_string_with_format(row, 0, &line.product, &cell)?;
            sheet.write_number_with_format(row, 1, quantity_cell(line.quantity), &centered)?;
            sheet.write_string_with_format(row, 2, CHECKBOX, &cell)?;
            row += 1;
        }

        // Blank separator between orders.
        row += 1;
    }

    set_widths(sheet, [50.0, 8.0, 6.0])?;
    Ok(workbook.save_to_buffer()?)
}

fn set_widths<const N: usize>(sheet: &mut Worksheet, widths: [f64; N]) -> Result<(), XlsxError> {
    for (col, width) in (0u16..).zip(widths) {
        sheet.set_column_width(col, width)?;
    }
    Ok(())
}
