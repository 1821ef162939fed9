// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory collaborators for exercising stratum without a graphics library
//! or a browser.
//!
//! - [`native`]: pictures, an animated-image codec and its decoder, all
//!   counting creations and deletions in a shared [`Ledger`](native::Ledger).
//! - [`canvas`]: rendering targets whose state stays observable after the
//!   surface pool has disposed them.
//! - [`dom`]: an element tree implementing
//!   [`ElementHost`](stratum_core::host::ElementHost) with an operation log.

#![no_std]

extern crate alloc;

pub mod canvas;
pub mod dom;
pub mod native;
