//! Shopify order-export CSV import.
//!
//! A Shopify export has one row per line item. Rows sharing the same `Name`
//! (order number) belong to one order; the first row of a group carries the
//! order-level columns. Delivery commune and date are not real columns: they
//! are embedded in the free-text `Note Attributes` column.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use vega_core::OrderNumber;

use crate::db::RepositoryError;
use crate::db::orders::{find_id_by_number, insert_order};
use crate::models::{NewOrder, NewOrderLine};

static ZONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"Comuna de Entrega:\s*([^\n]+)").unwrap()
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"Fecha de Entrega:\s*(\d{4}-\d{2}-\d{2})").unwrap()
});

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names of the Shopify order export.
mod columns {
    pub const NAME: &str = "Name";
    pub const EMAIL: &str = "Email";
    pub const TOTAL: &str = "Total";
    pub const CREATED_AT: &str = "Created at";
    pub const NOTE_ATTRIBUTES: &str = "Note Attributes";
    pub const SHIPPING_NAME: &str = "Shipping Name";
    pub const BILLING_NAME: &str = "Billing Name";
    pub const SHIPPING_ADDRESS: &str = "Shipping Address1";
    pub const PHONE: &str = "Phone";
    pub const SHIPPING_PHONE: &str = "Shipping Phone";
    pub const LINEITEM_NAME: &str = "Lineitem name";
    pub const LINEITEM_QUANTITY: &str = "Lineitem quantity";
    pub const LINEITEM_PRICE: &str = "Lineitem price";
    pub const LINEITEM_SKU: &str = "Lineitem sku";
}

/// Errors that can occur while reading an export.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A required column is absent from the header row.
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    /// A numeric field could not be parsed.
    #[error("row {row}: invalid {column}: {value:?}")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },

    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Storing the parsed orders failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Delivery details extracted from the `Note Attributes` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteAttributes {
    pub delivery_zone: Option<String>,
    pub delivery_date: Option<NaiveDate>,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Orders stored.
    pub inserted: usize,
    /// Orders skipped because the order number already exists.
    pub duplicates: usize,
    /// Orders skipped because no delivery date could be read.
    pub missing_date: usize,
}

/// Extract the delivery commune and date from a note-attributes blob.
///
/// A date that looks like `YYYY-MM-DD` but is not a real calendar date is
/// treated as absent.
#[must_use]
pub fn parse_note_attributes(text: &str) -> NoteAttributes {
    let delivery_zone = ZONE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|zone| !zone.is_empty());

    let delivery_date = DATE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok());

    NoteAttributes {
        delivery_zone,
        delivery_date,
    }
}

/// Decode uploaded bytes to text.
///
/// A UTF-8 byte-order mark is dropped. Bytes that are not valid UTF-8 are
/// read as Windows-1252, which is what spreadsheet tools on Windows emit.
#[must_use]
pub fn decode_csv_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Header lookup for one export.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Result<Self, ImportError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        if !index.contains_key(columns::NAME) {
            return Err(ImportError::MissingColumn(columns::NAME));
        }
        Ok(Self { index })
    }

    /// Trimmed value of a column, `None` when the column is absent or empty.
    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.index
            .get(column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn parse_number<T: FromStr>(
    value: Option<&str>,
    default: T,
    row: usize,
    column: &'static str,
) -> Result<T, ImportError> {
    value.map_or(Ok(default), |v| {
        v.parse().map_err(|_| ImportError::InvalidField {
            row,
            column,
            value: v.to_string(),
        })
    })
}

/// Parse the export's `Created at`, e.g. `2026-03-08 14:22:05 -0300`.
///
/// The UTC offset is dropped and the local wall-clock time kept.
fn parse_created_at(value: &str) -> Option<NaiveDateTime> {
    let local = value
        .split_once(" -")
        .or_else(|| value.split_once(" +"))
        .map_or(value, |(local, _)| local);
    NaiveDateTime::parse_from_str(local.trim(), CREATED_AT_FORMAT).ok()
}

/// Parse a Shopify order export into orders, in order of first appearance.
///
/// Orders without a delivery date are returned too; [`import_orders`]
/// decides what to do with them.
///
/// # Errors
///
/// Returns `ImportError::MissingColumn` if there is no `Name` column,
/// `ImportError::InvalidField` for a non-numeric quantity, price or total,
/// and `ImportError::Csv` for malformed input.
pub fn parse_shopify_csv(text: &str) -> Result<Vec<NewOrder>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let cols = Columns::new(reader.headers()?)?;

    let mut orders: Vec<NewOrder> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // Spreadsheet row number: header is row 1.
        let row = index + 2;

        let Some(name) = cols.get(&record, columns::NAME) else {
            continue;
        };

        let position = if let Some(&position) = positions.get(name) {
            position
        } else {
            let order = parse_order_header(&cols, &record, name, row)?;
            orders.push(order);
            positions.insert(name.to_string(), orders.len() - 1);
            orders.len() - 1
        };

        if let Some(product) = cols.get(&record, columns::LINEITEM_NAME) {
            let line = NewOrderLine {
                product: product.to_string(),
                quantity: parse_number(
                    cols.get(&record, columns::LINEITEM_QUANTITY),
                    1,
                    row,
                    columns::LINEITEM_QUANTITY,
                )?,
                price: parse_number(
                    cols.get(&record, columns::LINEITEM_PRICE),
                    Decimal::ZERO,
                    row,
                    columns::LINEITEM_PRICE,
                )?,
                sku: cols.get(&record, columns::LINEITEM_SKU).map(str::to_string),
            };
            if let Some(order) = orders.get_mut(position) {
                order.lines.push(line);
            }
        }
    }

    Ok(orders)
}

fn parse_order_header(
    cols: &Columns,
    record: &StringRecord,
    name: &str,
    row: usize,
) -> Result<NewOrder, ImportError> {
    let order_number = OrderNumber::parse(name).map_err(|_| ImportError::InvalidField {
        row,
        column: columns::NAME,
        value: name.to_string(),
    })?;

    let notes = cols
        .get(record, columns::NOTE_ATTRIBUTES)
        .map(parse_note_attributes)
        .unwrap_or_default();

    let mut order = NewOrder::new(order_number);
    order.email = cols.get(record, columns::EMAIL).map(str::to_string);
    order.delivery_zone = notes.delivery_zone;
    order.delivery_date = notes.delivery_date;
    order.original_delivery_date = notes.delivery_date;
    order.customer_name = cols
        .get(record, columns::SHIPPING_NAME)
        .or_else(|| cols.get(record, columns::BILLING_NAME))
        .map(str::to_string);
    order.address = cols.get(record, columns::SHIPPING_ADDRESS).map(str::to_string);
    order.phone = cols
        .get(record, columns::PHONE)
        .or_else(|| cols.get(record, columns::SHIPPING_PHONE))
        .map(str::to_string);
    order.total = parse_number(
        cols.get(record, columns::TOTAL),
        Decimal::ZERO,
        row,
        columns::TOTAL,
    )?;
    order.created_at = cols
        .get(record, columns::CREATED_AT)
        .and_then(parse_created_at);

    Ok(order)
}

/// Store parsed orders in one transaction.
///
/// An order whose number already exists is skipped without touching the
/// stored row. An order without a delivery date is never stored.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails; nothing is stored
/// in that case.
#[instrument(skip(pool, orders), fields(orders = orders.len()))]
pub async fn import_orders(
    pool: &SqlitePool,
    orders: &[NewOrder],
) -> Result<ImportSummary, RepositoryError> {
    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for order in orders {
        if find_id_by_number(&mut *tx, order.order_number.as_str())
            .await?
            .is_some()
        {
            summary.duplicates += 1;
            continue;
        }
        if order.delivery_date.is_none() {
            tracing::debug!(
                order_number = %order.order_number,
                "Skipping order without delivery date"
            );
            summary.missing_date += 1;
            continue;
        }

        insert_order(&mut *tx, order, None).await?;
        summary.inserted += 1;
    }

    tx.commit().await?;

    tracing::info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        missing_date = summary.missing_date,
        "Orders imported"
    );
    Ok(summary)
}

/// Decode, parse and store a Shopify export.
///
/// # Errors
///
/// Returns any error from [`parse_shopify_csv`] or [`import_orders`].
pub async fn import_csv(pool: &SqlitePool, bytes: &[u8]) -> Result<ImportSummary, ImportError> {
    let text = decode_csv_bytes(bytes);
    let orders = parse_shopify_csv(&text)?;
    Ok(import_orders(pool, &orders).await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vega_core::OrderStatus;

    use super::*;
    use crate::db::{OrderRepository, create_memory_pool};

    const HEADER: &str = "Name,Email,Total,Created at,Lineitem quantity,Lineitem name,Lineitem price,Lineitem sku,Billing Name,Shipping Name,Shipping Address1,Shipping Phone,Phone,Note Attributes";

    fn export(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    fn sample() -> String {
        export(&[
            r#"#1001,ana@example.com,15990.00,2026-03-08 14:22:05 -0300,2,Palta Hass,4990,PAL-1,Ana B,Ana Pérez,Av. Siempre Viva 742,+56911111111,,"Comuna de Entrega: Ñuñoa
Fecha de Entrega: 2026-03-10""#,
            "#1001,,,,1,Tomate,1500,,,,,,,",
            "#1002,luis@example.com,3000,2026-03-08 15:00:00 +0000,,Lechuga,,,Luis Soto,,,,+56922222222,Comuna de Entrega: Providencia",
        ])
    }

    #[test]
    fn test_parse_note_attributes() {
        let notes =
            parse_note_attributes("Comuna de Entrega:  Las Condes \nFecha de Entrega: 2026-03-10");
        assert_eq!(notes.delivery_zone.as_deref(), Some("Las Condes"));
        assert_eq!(notes.delivery_date, NaiveDate::from_ymd_opt(2026, 3, 10));

        assert_eq!(parse_note_attributes("nothing here"), NoteAttributes::default());
        assert_eq!(
            parse_note_attributes("Fecha de Entrega: 2026-02-30").delivery_date,
            None
        );
    }

    #[test]
    fn test_parse_groups_rows_by_order_number() {
        let orders = parse_shopify_csv(&sample()).unwrap();
        assert_eq!(orders.len(), 2);

        let first = &orders[0];
        assert_eq!(first.order_number.as_str(), "#1001");
        assert_eq!(first.customer_name.as_deref(), Some("Ana Pérez"));
        assert_eq!(first.phone.as_deref(), Some("+56911111111"));
        assert_eq!(first.delivery_zone.as_deref(), Some("Ñuñoa"));
        assert_eq!(first.delivery_date, NaiveDate::from_ymd_opt(2026, 3, 10));
        assert_eq!(first.total, Decimal::new(1_599_000, 2));
        assert_eq!(
            first.created_at,
            NaiveDate::from_ymd_opt(2026, 3, 8).and_then(|d| d.and_hms_opt(14, 22, 5))
        );
        assert_eq!(first.lines.len(), 2);
        assert_eq!(first.lines[0].sku.as_deref(), Some("PAL-1"));
        assert_eq!(first.lines[1].product, "Tomate");

        let second = &orders[1];
        assert_eq!(second.customer_name.as_deref(), Some("Luis Soto"));
        assert_eq!(second.delivery_date, None);
        assert_eq!(second.lines[0].quantity, 1);
        assert_eq!(second.lines[0].price, Decimal::ZERO);
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        let text = export(&["#1,,,,dos,Palta,,,,,,,,"]);
        let err = parse_shopify_csv(&text).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidField { row: 2, column: "Lineitem quantity", .. }
        ));
    }

    #[test]
    fn test_parse_requires_name_column() {
        let err = parse_shopify_csv("Email,Total\na@b.c,10").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn("Name")));
    }

    #[test]
    fn test_parse_skips_rows_without_name() {
        let text = export(&[",,,,1,Huérfano,,,,,,,,"]);
        assert!(parse_shopify_csv(&text).unwrap().is_empty());
    }

    #[test]
    fn test_parse_accepts_long_order_names() {
        let name = format!("#PEDIDO-{}", "X".repeat(80));
        let text = export(&[&format!("{name},,,,1,Palta,,,,,,,,")]);
        let orders = parse_shopify_csv(&text).unwrap();
        assert_eq!(orders[0].order_number.as_str(), name);
    }

    #[test]
    fn test_decode_strips_bom_and_falls_back_to_windows_1252() {
        assert_eq!(decode_csv_bytes(b"\xEF\xBB\xBFName"), "Name");
        assert_eq!(decode_csv_bytes(b"Pi\xF1a"), "Piña");
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();

        let first = import_csv(&pool, sample().as_bytes()).await.unwrap();
        assert_eq!(
            first,
            ImportSummary {
                inserted: 1,
                duplicates: 0,
                missing_date: 1,
            }
        );

        let second = import_csv(&pool, sample().as_bytes()).await.unwrap();
        assert_eq!(
            second,
            ImportSummary {
                inserted: 0,
                duplicates: 1,
                missing_date: 1,
            }
        );

        let repo = OrderRepository::new(&pool);
        assert!(repo.get_by_number("#1002").await.unwrap().is_none());
        let order = repo.get_by_number("#1001").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.original_delivery_date, order.delivery_date);
        assert_eq!(repo.lines(order.id).await.unwrap().len(), 2);
    }
}
