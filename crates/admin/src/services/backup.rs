//! Full-database backup to an Excel workbook, and restore from one.
//!
//! # Workbook layout
//!
//! | Sheet | Columns |
//! |-------|---------|
//! | `Pedidos` | ID, Número Orden, Email, Cliente, Comuna, Dirección, Teléfono, Fecha Entrega, Fecha Original, Total, Status, Creado, Completado, Importado |
//! | `Líneas de Pedido` | Pedido ID, Número Orden, Producto, Cantidad, Precio, SKU |
//! | `Categorías` | ID, Nombre, Orden |
//! | `Producto-Categoría` | Producto, Categoría |
//! | `Resumen` | generation time and per-status counts (not restored) |
//!
//! Rows reference each other by order number and category name, never by
//! database ID, so a backup can be restored into a database with different
//! IDs.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx, open_workbook_from_rs};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use vega_core::{OrderId, OrderNumber, OrderStatus};

use super::spreadsheet::header_format;
use crate::db::categories::{insert_if_absent, map_if_absent};
use crate::db::orders::{BackupLine, find_id_by_number, insert_line, insert_order};
use crate::db::{CategoryRepository, OrderRepository, RepositoryError};
use crate::models::{
    Category, DEFAULT_RESTORED_ORDER, NewOrder, NewOrderLine, Order, ProductMapping,
};

pub const ORDERS_SHEET: &str = "Pedidos";
pub const LINES_SHEET: &str = "Líneas de Pedido";
pub const CATEGORIES_SHEET: &str = "Categorías";
pub const MAPPINGS_SHEET: &str = "Producto-Categoría";
pub const SUMMARY_SHEET: &str = "Resumen";

const ORDER_HEADERS: [&str; 14] = [
    "ID",
    "Número Orden",
    "Email",
    "Cliente",
    "Comuna",
    "Dirección",
    "Teléfono",
    "Fecha Entrega",
    "Fecha Original",
    "Total",
    "Status",
    "Creado",
    "Completado",
    "Importado",
];
const LINE_HEADERS: [&str; 6] = [
    "Pedido ID",
    "Número Orden",
    "Producto",
    "Cantidad",
    "Precio",
    "SKU",
];
const CATEGORY_HEADERS: [&str; 3] = ["ID", "Nombre", "Orden"];
const MAPPING_HEADERS: [&str; 2] = ["Producto", "Categoría"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Stored timestamps keep their fractional seconds in a backup.
const STORED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Errors that can occur during backup or restore.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Writing the workbook failed.
    #[error("xlsx write error: {0}")]
    Write(#[from] XlsxError),

    /// The uploaded file is not a readable xlsx workbook.
    #[error("unreadable workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    /// A row holds a value that cannot be restored.
    #[error("sheet {sheet:?}, row {row}: {message}")]
    InvalidRow {
        sheet: &'static str,
        row: usize,
        message: String,
    },
}

impl From<sqlx::Error> for BackupError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

impl BackupError {
    /// Returns true if the error comes from the uploaded file rather than
    /// from the server.
    #[must_use]
    pub const fn is_bad_input(&self) -> bool {
        matches!(self, Self::Read(_) | Self::InvalidRow { .. })
    }
}

/// How a restore treats stale pending orders.
#[derive(Debug, Clone, Copy)]
pub struct RestoreOptions {
    /// The restore time. Pending orders due before its date are stale, and
    /// it is their completion time when they are auto-completed.
    pub now: NaiveDateTime,
    /// Store stale pending orders as completed.
    pub auto_complete_past: bool,
}

/// Outcome of a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    /// Orders inserted.
    pub restored: usize,
    /// Orders left alone because their number already exists.
    pub skipped: usize,
    /// Inserted orders stored as completed because their date had passed.
    pub auto_completed: usize,
    pub lines_restored: usize,
    pub categories_added: usize,
    pub mappings_added: usize,
}

/// Download filename of a backup taken at `now`.
#[must_use]
pub fn backup_filename(now: NaiveDateTime) -> String {
    format!("backup_vega_{}.xlsx", now.format("%Y-%m-%d_%H%M"))
}

// =============================================================================
// Backup
// =============================================================================

/// Export every table to a workbook.
///
/// # Errors
///
/// Returns `BackupError::Repository` if a query fails and
/// `BackupError::Write` if the workbook cannot be written.
#[instrument(skip(pool))]
pub async fn build_backup(
    pool: &SqlitePool,
    now: NaiveDateTime,
) -> Result<Vec<u8>, BackupError> {
    let orders_repo = OrderRepository::new(pool);
    let categories_repo = CategoryRepository::new(pool);

    let orders = orders_repo.all().await?;
    let lines = orders_repo.all_lines().await?;
    let categories = categories_repo.list().await?;
    let mappings = categories_repo.mappings().await?;
    let counts = orders_repo.status_counts().await?;

    let mut workbook = Workbook::new();
    write_orders(workbook.add_worksheet(), &orders)?;
    write_lines(workbook.add_worksheet(), &lines)?;
    write_categories(workbook.add_worksheet(), &categories)?;
    write_mappings(workbook.add_worksheet(), &mappings)?;

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    summary.write_string(0, 0, "Backup Sistema La Vega")?;
    summary.write_string(1, 0, "Generado:")?;
    summary.write_string(1, 1, now.format(TIMESTAMP_FORMAT).to_string())?;
    for (row, (label, count)) in (3u32..).zip([
        ("Pedidos pendientes:", counts.pending),
        ("Pedidos postergados:", counts.postponed),
        ("Pedidos completados:", counts.completed),
        ("Total:", counts.total()),
    ]) {
        summary.write_string(row, 0, label)?;
        summary.write_number(row, 1, as_cell_number(count))?;
    }
    summary.set_column_width(0, 24)?;

    let bytes = workbook.save_to_buffer()?;
    tracing::info!(
        orders = orders.len(),
        lines = lines.len(),
        categories = categories.len(),
        bytes = bytes.len(),
        "Backup built"
    );
    Ok(bytes)
}

#[allow(clippy::cast_precision_loss)]
fn as_cell_number(value: i64) -> f64 {
    value as f64
}

fn write_header(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    let format = header_format();
    for (col, title) in (0u16..).zip(headers) {
        sheet.write_string_with_format(0, col, *title, &format)?;
    }
    Ok(())
}

fn write_opt(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<&str>,
) -> Result<(), XlsxError> {
    if let Some(value) = value {
        sheet.write_string(row, col, value)?;
    }
    Ok(())
}

fn write_decimal(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Decimal,
) -> Result<(), XlsxError> {
    match value.to_f64() {
        Some(number) => sheet.write_number(row, col, number)?,
        None => sheet.write_string(row, col, value.to_string())?,
    };
    Ok(())
}

fn write_orders(sheet: &mut Worksheet, orders: &[Order]) -> Result<(), XlsxError> {
    sheet.set_name(ORDERS_SHEET)?;
    write_header(sheet, &ORDER_HEADERS)?;

    for (row, order) in (1u32..).zip(orders) {
        sheet.write_number(row, 0, as_cell_number(order.id.as_i64()))?;
        sheet.write_string(row, 1, order.order_number.as_str())?;
        write_opt(sheet, row, 2, order.email.as_deref())?;
        write_opt(sheet, row, 3, order.customer_name.as_deref())?;
        write_opt(sheet, row, 4, order.delivery_zone.as_deref())?;
        write_opt(sheet, row, 5, order.address.as_deref())?;
        write_opt(sheet, row, 6, order.phone.as_deref())?;
        write_opt(sheet, row, 7, order.delivery_date.map(|d| d.to_string()).as_deref())?;
        write_opt(
            sheet,
            row,
            8,
            order.original_delivery_date.map(|d| d.to_string()).as_deref(),
        )?;
        write_decimal(sheet, row, 9, order.total)?;
        sheet.write_string(row, 10, order.status.as_str())?;
        write_timestamp(sheet, row, 11, order.created_at)?;
        write_timestamp(sheet, row, 12, order.completed_at)?;
        write_timestamp(sheet, row, 13, order.imported_at)?;
    }
    Ok(())
}

fn write_timestamp(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<NaiveDateTime>,
) -> Result<(), XlsxError> {
    let text = value.map(|t| t.format(STORED_TIMESTAMP_FORMAT).to_string());
    write_opt(sheet, row, col, text.as_deref())
}

fn write_lines(sheet: &mut Worksheet, lines: &[BackupLine]) -> Result<(), XlsxError> {
    sheet.set_name(LINES_SHEET)?;
    write_header(sheet, &LINE_HEADERS)?;

    for (row, entry) in (1u32..).zip(lines) {
        sheet.write_number(row, 0, as_cell_number(entry.order_id.as_i64()))?;
        sheet.write_string(row, 1, entry.order_number.as_str())?;
        sheet.write_string(row, 2, entry.line.product.as_str())?;
        sheet.write_number(row, 3, as_cell_number(entry.line.quantity))?;
        write_decimal(sheet, row, 4, entry.line.price)?;
        write_opt(sheet, row, 5, entry.line.sku.as_deref())?;
    }
    Ok(())
}

fn write_categories(sheet: &mut Worksheet, categories: &[Category]) -> Result<(), XlsxError> {
    sheet.set_name(CATEGORIES_SHEET)?;
    write_header(sheet, &CATEGORY_HEADERS)?;

    for (row, category) in (1u32..).zip(categories) {
        sheet.write_number(row, 0, as_cell_number(category.id.as_i64()))?;
        sheet.write_string(row, 1, category.name.as_str())?;
        sheet.write_number(row, 2, as_cell_number(category.display_order))?;
    }
    Ok(())
}

fn write_mappings(sheet: &mut Worksheet, mappings: &[ProductMapping]) -> Result<(), XlsxError> {
    sheet.set_name(MAPPINGS_SHEET)?;
    write_header(sheet, &MAPPING_HEADERS)?;

    for (row, mapping) in (1u32..).zip(mappings) {
        sheet.write_string(row, 0, mapping.product.as_str())?;
        sheet.write_string(row, 1, mapping.category.as_str())?;
    }
    Ok(())
}

// =============================================================================
// Restore
// =============================================================================

/// Text of a cell as a user would read it. Whole numbers print without a
/// fractional part so `2.0` reads as `2`.
#[must_use]
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        #[allow(clippy::cast_possible_truncation)]
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// One data row of a sheet, with its spreadsheet row number.
struct SheetRow<'a> {
    sheet: &'static str,
    number: usize,
    cells: &'a [Data],
}

impl SheetRow<'_> {
    fn text(&self, col: usize) -> Option<String> {
        self.cells
            .get(col)
            .map(cell_text)
            .filter(|text| !text.is_empty())
    }

    fn invalid(&self, message: impl Into<String>) -> BackupError {
        BackupError::InvalidRow {
            sheet: self.sheet,
            row: self.number,
            message: message.into(),
        }
    }

    /// A date column; only the first ten characters (`YYYY-MM-DD`) count.
    fn date(&self, col: usize) -> Option<NaiveDate> {
        self.text(col).and_then(|text| {
            text.get(..10)
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        })
    }

    /// A timestamp column, with or without fractional seconds.
    fn timestamp(&self, col: usize) -> Option<NaiveDateTime> {
        self.text(col).and_then(|text| {
            NaiveDateTime::parse_from_str(&text, STORED_TIMESTAMP_FORMAT)
                .ok()
                .or_else(|| {
                    text.get(..19)
                        .and_then(|t| NaiveDateTime::parse_from_str(t, TIMESTAMP_FORMAT).ok())
                })
        })
    }

    fn decimal(&self, col: usize, name: &str) -> Result<Decimal, BackupError> {
        self.text(col).map_or(Ok(Decimal::ZERO), |text| {
            text.parse()
                .map_err(|_| self.invalid(format!("invalid {name} {text:?}")))
        })
    }
}

fn data_rows<'a>(
    sheet: &'static str,
    range: &'a Range<Data>,
) -> impl Iterator<Item = SheetRow<'a>> {
    range
        .rows()
        .enumerate()
        .skip(1)
        .map(move |(index, cells)| SheetRow {
            sheet,
            number: index + 1,
            cells,
        })
}

/// Sheets of an uploaded backup. A missing sheet restores nothing.
struct BackupWorkbook {
    orders: Option<Range<Data>>,
    lines: Option<Range<Data>>,
    categories: Option<Range<Data>>,
    mappings: Option<Range<Data>>,
}

impl BackupWorkbook {
    fn read(bytes: &[u8]) -> Result<Self, BackupError> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        let names = workbook.sheet_names();

        let mut sheet = |name: &str| -> Result<Option<Range<Data>>, BackupError> {
            if names.iter().any(|n| n == name) {
                Ok(Some(workbook.worksheet_range(name)?))
            } else {
                Ok(None)
            }
        };

        Ok(Self {
            orders: sheet(ORDERS_SHEET)?,
            lines: sheet(LINES_SHEET)?,
            categories: sheet(CATEGORIES_SHEET)?,
            mappings: sheet(MAPPINGS_SHEET)?,
        })
    }
}

/// An order read back from the `Pedidos` sheet.
struct RestoredOrder {
    order: NewOrder,
    completed_at: Option<NaiveDateTime>,
}

/// Read one order row. The completion and import columns are optional so
/// that workbooks written without them still restore.
fn parse_order_row(row: &SheetRow<'_>) -> Result<Option<RestoredOrder>, BackupError> {
    let Some(number) = row.text(1) else {
        return Ok(None);
    };
    let order_number =
        OrderNumber::parse(&number).map_err(|e| row.invalid(format!("order number: {e}")))?;
    let status = match row.text(10) {
        Some(text) => text.parse::<OrderStatus>().map_err(|e| row.invalid(e))?,
        None => OrderStatus::Pending,
    };

    let mut order = NewOrder::new(order_number);
    order.email = row.text(2);
    order.customer_name = row.text(3);
    order.delivery_zone = row.text(4);
    order.address = row.text(5);
    order.phone = row.text(6);
    order.delivery_date = row.date(7);
    order.original_delivery_date = row.date(8);
    order.total = row.decimal(9, "total")?;
    order.status = status;
    order.created_at = row.timestamp(11);
    order.imported_at = row.timestamp(13);
    Ok(Some(RestoredOrder {
        order,
        completed_at: row.timestamp(12),
    }))
}

fn parse_line_row(row: &SheetRow<'_>) -> Result<Option<(String, NewOrderLine)>, BackupError> {
    let (Some(number), Some(product)) = (row.text(1), row.text(2)) else {
        return Ok(None);
    };
    let quantity = match row.text(3) {
        Some(text) => text
            .parse()
            .map_err(|_| row.invalid(format!("invalid quantity {text:?}")))?,
        None => 1,
    };

    let line = NewOrderLine {
        product,
        quantity,
        price: row.decimal(4, "price")?,
        sku: row.text(5),
    };
    Ok(Some((number, line)))
}

/// Restore a backup into the database in one transaction.
///
/// Nothing that already exists is overwritten: categories and product
/// mappings are added only when absent, an order whose number exists is
/// skipped, and line items are added only to orders inserted by this
/// restore. Restoring the same file twice therefore changes nothing the
/// second time.
///
/// # Errors
///
/// Returns `BackupError::Read` or `BackupError::InvalidRow` for a bad file
/// and `BackupError::Repository` if a query fails. Nothing is stored on
/// error.
#[instrument(skip(pool, bytes), fields(bytes = bytes.len()))]
pub async fn restore_backup(
    pool: &SqlitePool,
    bytes: &[u8],
    options: RestoreOptions,
) -> Result<RestoreSummary, BackupError> {
    let workbook = BackupWorkbook::read(bytes)?;
    let mut summary = RestoreSummary::default();
    let mut tx = pool.begin().await?;

    if let Some(range) = &workbook.categories {
        for row in data_rows(CATEGORIES_SHEET, range) {
            let Some(name) = row.text(1) else { continue };
            let display_order = match row.text(2) {
                Some(text) => text
                    .parse()
                    .map_err(|_| row.invalid(format!("invalid display order {text:?}")))?,
                None => DEFAULT_RESTORED_ORDER,
            };
            if insert_if_absent(&mut *tx, &name, display_order).await? {
                summary.categories_added += 1;
            }
        }
    }

    if let Some(range) = &workbook.mappings {
        for row in data_rows(MAPPINGS_SHEET, range) {
            let (Some(product), Some(category)) = (row.text(0), row.text(1)) else {
                continue;
            };
            if map_if_absent(&mut *tx, &product, &category).await? {
                summary.mappings_added += 1;
            }
        }
    }

    let mut inserted: HashMap<String, OrderId> = HashMap::new();
    if let Some(range) = &workbook.orders {
        for row in data_rows(ORDERS_SHEET, range) {
            let Some(RestoredOrder {
                mut order,
                mut completed_at,
            }) = parse_order_row(&row)?
            else {
                continue;
            };
            if inserted.contains_key(order.order_number.as_str())
                || find_id_by_number(&mut *tx, order.order_number.as_str())
                    .await?
                    .is_some()
            {
                summary.skipped += 1;
                continue;
            }

            let stale = order
                .delivery_date
                .is_some_and(|date| date < options.now.date());
            if options.auto_complete_past && order.status == OrderStatus::Pending && stale {
                order.status = OrderStatus::Completed;
                completed_at = Some(options.now);
                summary.auto_completed += 1;
            }

            let id = insert_order(&mut *tx, &order, completed_at).await?;
            inserted.insert(order.order_number.into_inner(), id);
            summary.restored += 1;
        }
    }

    if let Some(range) = &workbook.lines {
        for row in data_rows(LINES_SHEET, range) {
            let Some((number, line)) = parse_line_row(&row)? else {
                continue;
            };
            if let Some(&order_id) = inserted.get(number.trim()) {
                insert_line(&mut *tx, order_id, &line).await?;
                summary.lines_restored += 1;
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        restored = summary.restored,
        skipped = summary.skipped,
        auto_completed = summary.auto_completed,
        lines = summary.lines_restored,
        "Backup restored"
    );
    Ok(summary)
}
