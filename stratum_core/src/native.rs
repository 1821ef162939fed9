// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability contract for the wrapped native graphics library.
//!
//! Stratum never creates or draws native objects itself. The graphics binding
//! (a CanvasKit-style library, a GPU backend, or an in-memory fake) implements
//! these traits and stratum decides *when* objects are created, shared,
//! deleted and recreated.
//!
//! Deletion at the native layer is irreversible: once [`NativeObject::delete`]
//! has run, the only way back is to build a brand-new handle through a
//! [`Resurrect`] recipe.

use alloc::boxed::Box;

/// A handle owned by the native graphics library.
pub trait NativeObject {
    /// Releases the native memory behind this handle.
    ///
    /// Called at most once per handle by stratum.
    fn delete(&mut self);

    /// Returns whether [`delete`](Self::delete) has run. Must be idempotent.
    fn is_deleted(&self) -> bool;
}

/// Failure to decode or recreate a native object.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The encoded bytes are not in a format the decoder understands.
    #[error("unsupported image format")]
    UnsupportedFormat,
    /// The encoded bytes are malformed.
    #[error("invalid image data: {0}")]
    InvalidData(&'static str),
    /// Decoding a particular frame failed.
    #[error("failed to decode frame {0}")]
    Frame(u32),
    /// The bytes could not be fetched.
    #[error("network fetch failed with status {0}")]
    Fetch(u16),
}

/// A recipe that recreates a native handle after it has been deleted.
///
/// Recipes retain whatever construction parameters they need (encoded bytes,
/// a recording, a playback position) for as long as the owning box is
/// resurrectable.
pub trait Resurrect<N> {
    /// Builds a fresh native handle equivalent to the one that was deleted.
    fn resurrect(&mut self) -> Result<N, DecodeError>;
}

impl<N, F> Resurrect<N> for F
where
    F: FnMut() -> Result<N, DecodeError>,
{
    fn resurrect(&mut self) -> Result<N, DecodeError> {
        self()
    }
}

/// A boxed recipe, as stored inside an object box.
pub type BoxedRecipe<N> = Box<dyn Resurrect<N>>;

/// A multi-frame image codec produced by an [`ImageDecoder`].
pub trait NativeCodec: NativeObject {
    /// Decoded pixel payload for one frame.
    type Frame;

    /// Number of frames in the encoded image (1 for still images).
    fn frame_count(&self) -> u32;

    /// Decodes the frame at the codec's current position and advances it,
    /// wrapping to the first frame after the last.
    fn decode_next_frame(&mut self) -> Result<Self::Frame, DecodeError>;
}

/// Creates native codecs from encoded bytes.
pub trait ImageDecoder {
    /// The codec type this decoder produces.
    type Codec: NativeCodec + 'static;

    /// Parses `bytes` and returns a codec positioned at the first frame.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Codec, DecodeError>;
}
