// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the pipeline.
//!
//! Storage and transport live outside this workspace; the pipeline only sees
//! them through these `#[async_trait]` seams.

pub mod delivery;
pub mod user_store;

pub use delivery::DeliveryAdapter;
pub use user_store::UserStore;
