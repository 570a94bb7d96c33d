//! Testing utilities for cascades and aggregators.
//!
//! This module provides:
//! - Scripted mock engines with call tracking
//! - Builders for canned engine responses

pub mod mocks;
