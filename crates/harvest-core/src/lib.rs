//! Core types for the harvest system.
//!
//! Repositories, branches and changes form the change-lineage graph; build
//! projects, integration types, platforms and builds form the build ledger.
//! This crate holds only the data model and validation; persistence lives in
//! `harvest-storage`.

pub mod build;
pub mod catalog;
pub mod change;
pub mod enums;
pub mod filter;
pub mod issue;
pub mod repository;
pub mod validation;
