// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering targets and the pool that bounds them.
//!
//! Each target wraps a scarce host resource (a canvas with its own GL
//! context), so the number of live targets is bounded by a
//! [`SurfaceFactory`]. Exhausting the pool is not an error: the factory
//! degrades to handing out a shared backup surface.

mod factory;
mod id;
mod target;

pub use factory::{AcquireKind, DEFAULT_SURFACE_CAPACITY, SurfaceFactory};
pub use id::SurfaceId;
pub use target::{PictureTarget, RenderTarget, SurfaceProvider};
