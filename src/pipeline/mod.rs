//! Orchestration of an EBD export run.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ run ──▶ export ──▶ ledger
//! (EBD keys)  (stages)  (files)   (summary)
//! ```
//!
//! 1. [`run`]    — drive each EBD through scraping, graph conversion and
//!    rendering; classify every failure at its stage boundary
//! 2. [`export`] — serialise tables and write artifacts atomically
//! 3. [`ledger`] — collect classified failures per `[severity:stage] kind`
//!    for the end-of-run summary

pub mod export;
pub mod ledger;
pub mod run;

pub use ledger::ErrorLedger;
pub use run::{process_ebd, run_pipeline, scrape_and_graph, EbdOutcome, OutputDirectory, RunReport};
