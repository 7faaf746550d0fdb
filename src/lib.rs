//! Temporal Cost Allocation Engine
//!
//! This crate computes the monthly unit cost of manufactured products: the
//! direct raw-material cost of each product's recipe or bill of materials at
//! the prices in force for the month, plus its line's share of company-wide
//! indirect overhead and labor spread over the month's production.
//!
//! A recompute costs every active product independently and commits the
//! results for the month in a single atomic upsert.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod store;
