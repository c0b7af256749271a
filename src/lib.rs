//! Core library for the nansen-tools command line application.
//!
//! The library turns the ship's activity log into formatted spreadsheet
//! workbooks. Field definitions live in [`nansen::tools::catalog`], tabular
//! data in [`nansen::tools::model`], the toktlogger client and the workbook
//! reader/writer under [`nansen::tools::io`], and the end-to-end export
//! orchestration in [`nansen::tools::export`].

pub mod nansen;

pub use nansen::tools::{Result, ToolError, catalog, error, export, io, model};
