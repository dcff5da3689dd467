//! FormFlow Form Service
//!
//! Digitizes paper forms: scans uploaded Word/PDF templates for placeholders,
//! maintains a shared field catalog, stores submissions, and exports filled
//! templates as PDF.

pub mod catalog;
pub mod docx;
pub mod export;
pub mod fill;
pub mod fonts;
pub mod http;
pub mod pdf_builder;
pub mod render;
pub mod resolver;
pub mod scanner;
pub mod service;
pub mod storage;
pub mod store;
pub mod submission;
