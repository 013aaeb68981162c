//! Intake Relay - conversational support intake for chat platforms
//!
//! This crate collects a structured case from a private chat over several
//! turns, then hands it off, with any attached files, to a support chat.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
