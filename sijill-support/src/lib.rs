//! # Sijill Support
//!
//! Shared utilities for the Sijill injector crates.
//!
//! This crate provides:
//! - Single-line rendering of injector error messages
//! - Token chain and provider description formatting

pub mod rendering;
