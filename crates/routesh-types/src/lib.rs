//! Foundation types for routesh.
//!
//! This crate contains the types shared by every routesh crate: the error
//! taxonomy (shell, validation, and plugin errors) and the shell
//! configuration.

pub mod config;
pub mod error;
