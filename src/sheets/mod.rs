//! Google Sheets access and bulk result write-back.

mod client;
mod memory;
mod worksheet;
mod writer;

pub use client::SheetsClient;
pub use memory::MemorySheet;
pub use worksheet::{
    column_index, column_letter, output_range, parse_cell, quote_title, records_from_rows,
    RangeUpdate, Worksheet,
};
pub use writer::{
    plan_batches, BatchFailure, BatchOutcome, ResultWriter, WriteBatch, WriteReport,
    DEFAULT_BATCH_SIZE, DEFAULT_WORKERS,
};
