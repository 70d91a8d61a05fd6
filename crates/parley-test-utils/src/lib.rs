// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock collaborators and a harness that assembles the full message
//! pipeline in process, so tests run without a messaging bridge or database.
//!
//! # Components
//!
//! - [`MockDelivery`] - Delivery adapter that records every call
//! - [`FailingUserStore`] / [`FlakyUserStore`] - User stores that fail on demand
//! - [`TestHarness`] - Pipeline wired with built-in commands and context handlers

pub mod harness;
pub mod mock_delivery;
pub mod stores;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_delivery::{DeliveryCall, MockDelivery};
pub use stores::{FailingUserStore, FlakyUserStore};
