//! ADGM submission review
//!
//! Checks a set of uploaded `.docx` files against the checklist of a
//! registration process, flags risky clauses with citations from the ADGM
//! reference corpus, and writes commented copies plus a JSON report.
//!
//! ## Pipeline
//!
//! 1. Extract and classify each upload
//! 2. Resolve the process and compute missing documents
//! 3. Detect red flags, citing the reference index
//! 4. Annotate flagged documents
//! 5. Persist the report

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::RunConfig;
pub use error::{ReviewError, Result};
pub use pipeline::{analyze_documents, inspect_document, open_reference_index, ProcessHint};
pub use report::ReportAssembler;
