//! Business logic services for the order store.
//!
//! # Services
//!
//! - `import` - Shopify CSV export parsing and import
//! - `spreadsheet` - Shopping-list and pick-sheet workbooks
//! - `backup` - Full backup to a workbook, and restore from one
//! - `email` - Backup delivery via SMTP

pub mod backup;
pub mod email;
pub mod import;
pub mod spreadsheet;

pub use backup::{
    BackupError, RestoreOptions, RestoreSummary, backup_filename, build_backup, restore_backup,
};
pub use email::{BackupAttachment, EmailError, EmailService, SmtpSettings, send_backup_email};
pub use import::{ImportError, ImportSummary, import_csv, import_orders, parse_shopify_csv};
pub use spreadsheet::{SpreadsheetError, XLSX_CONTENT_TYPE, render_pick_list, render_shopping_list};
