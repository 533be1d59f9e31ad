//! # Waybill
//!
//! Freight cost spreadsheet ingestion and deterministic inventory optimization.
//! Carrier billing exports (parcel, LTL, truckload) arrive as multi-sheet
//! workbooks and delimited text with wildly inconsistent structure: logo rows
//! above the real header, renamed cost columns, mixed encodings. This crate
//! turns those files into a structural catalog and a monetary baseline, and
//! feeds derived figures into closed-form inventory-policy computations.
//!
//! ## Features
//!
//! - **Multi-format ingestion**: workbook files (`.xlsx`, `.xlsm`) parsed
//!   directly from their ZIP/XML parts, and delimited text (`.csv`, `.tsv`,
//!   `.txt`) with encoding and separator sniffing
//! - **Header detection**: locates the true header row beneath logo and
//!   address rows by scoring labeled-text density
//! - **Column classification**: rule-based semantic roles with confidence
//!   scores and ranked alternatives, auditable by signal source
//! - **Baseline extraction**: tiered cost-column resolution from exact
//!   canonical names through fuzzy keywords to a largest-sum fallback
//! - **Inventory optimization**: safety stock, cycle stock, and holding
//!   cost per forecast year, from an exact inverse-normal approximation
//! - **Reproducible randomness**: stable configuration-derived seeds and a
//!   Lehmer generator, so identical inputs always yield identical runs
//!
//! The crate performs no storage or network I/O: callers supply file bytes
//! and forecast parameters, and persist the returned values themselves.

pub mod baseline;
pub mod catalog;
pub mod error;
pub mod helpers;
pub mod optimize;
pub mod sheet;

pub use baseline::extract_baseline;
pub use baseline::BaselineExtraction;
pub use baseline::CarrierType;
pub use baseline::ExtractionMethod;
pub use catalog::catalog_file;
pub use catalog::catalog_sheets;
pub use catalog::ClassifyMethod;
pub use catalog::Classifier;
pub use catalog::ColumnClassification;
pub use catalog::ColumnRole;
pub use catalog::FileCatalog;
pub use catalog::SheetCatalog;
pub use error::WaybillError;
pub use optimize::inventory_by_year;
pub use optimize::inverse_standard_normal_cdf;
pub use optimize::seed_from;
pub use optimize::ForecastRow;
pub use optimize::InventoryPolicy;
pub use optimize::InventoryYearResult;
pub use optimize::Lehmer;
pub use optimize::PolicyError;
pub use sheet::parse_file;
pub use sheet::CellValue;
pub use sheet::ParsedFile;
pub use sheet::ParsedSheet;
pub use sheet::SheetFormat;
