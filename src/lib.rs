//! folio — backend for a portfolio site: inquiry emails, editable content,
//! an admin inbox and AI copy drafting.

pub mod config;
pub mod drafts;
pub mod error;
pub mod icons;
pub mod llm;
pub mod mail;
pub mod pipeline;
pub mod store;
pub mod web;
