// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animated images backed by a resurrectable codec.
//!
//! The codec box keeps the encoded bytes and the playback position in its
//! recipe. When the codec is evicted (or its last reference is disposed and
//! it is accessed again before the collection pass), the bytes are decoded
//! afresh and the new codec is advanced to the saved position, so playback
//! continues with the frame that would have come next.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;
use core::future::Future;

use crate::native::{DecodeError, ImageDecoder, NativeCodec, Resurrect};
use crate::object::{BoxRef, Collector};

/// Decoded frame type of decoder `D`.
pub type FrameOf<D> = <<D as ImageDecoder>::Codec as NativeCodec>::Frame;

struct CodecRecipe<D> {
    decoder: D,
    bytes: Rc<[u8]>,
    position: Rc<Cell<u32>>,
}

impl<D: ImageDecoder> Resurrect<D::Codec> for CodecRecipe<D> {
    fn resurrect(&mut self) -> Result<D::Codec, DecodeError> {
        let mut codec = self.decoder.decode(&self.bytes)?;
        let count = codec.frame_count();
        if count == 0 {
            return Err(DecodeError::InvalidData("image has no frames"));
        }
        for _ in 0..self.position.get() % count {
            // Skipped frames are decoded and dropped.
            let _ = codec.decode_next_frame()?;
        }
        Ok(codec)
    }
}

/// A multi-frame image whose playback position survives resurrection.
///
/// Clones made with [`clone_ref`](Self::clone_ref) share the codec and the
/// position.
pub struct AnimatedImage<D: ImageDecoder + 'static> {
    codec: BoxRef<D::Codec>,
    position: Rc<Cell<u32>>,
    frame_count: u32,
}

impl<D: ImageDecoder + 'static> fmt::Debug for AnimatedImage<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatedImage")
            .field("codec", &self.codec.box_id())
            .field("position", &self.position.get())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl<D: ImageDecoder + 'static> AnimatedImage<D> {
    /// Decodes `bytes` into a codec positioned at the first frame.
    ///
    /// The decoder and the bytes are kept for resurrection.
    #[track_caller]
    pub fn decode(
        collector: &Collector,
        decoder: D,
        bytes: impl Into<Rc<[u8]>>,
    ) -> Result<Self, DecodeError> {
        let position = Rc::new(Cell::new(0));
        let recipe = CodecRecipe {
            decoder,
            bytes: bytes.into(),
            position: position.clone(),
        };
        let codec = BoxRef::resurrectable(collector, Box::new(recipe))?;
        let frame_count = codec
            .raw_native()
            .map_or(1, |native| native.frame_count());
        Ok(Self {
            codec,
            position,
            frame_count,
        })
    }

    /// Awaits `fetch` for the encoded bytes, then decodes them.
    ///
    /// A failed fetch is returned as is; nothing is boxed.
    pub async fn fetch_and_decode<F>(
        collector: &Collector,
        decoder: D,
        fetch: F,
    ) -> Result<Self, DecodeError>
    where
        F: Future<Output = Result<Vec<u8>, DecodeError>>,
    {
        let bytes = fetch.await?;
        Self::decode(collector, decoder, bytes)
    }

    /// Decodes the frame at the current position and advances, wrapping
    /// after the last frame.
    ///
    /// Recreates the codec first if it was evicted.
    pub fn next_frame(&self) -> Result<FrameOf<D>, DecodeError> {
        let frame = self.codec.native()?.decode_next_frame()?;
        self.position.set((self.position.get() + 1) % self.frame_count);
        Ok(frame)
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Returns the index of the frame [`next_frame`](Self::next_frame) will
    /// produce.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position.get()
    }

    /// Deletes the codec while keeping the image usable.
    pub fn evict(&self) -> bool {
        self.codec.evict()
    }

    /// Returns the underlying codec box.
    #[must_use]
    pub fn box_ref(&self) -> &BoxRef<D::Codec> {
        &self.codec
    }

    /// Acquires another reference sharing the codec and the position.
    #[track_caller]
    #[must_use]
    pub fn clone_ref(&self) -> Self {
        Self {
            codec: self.codec.clone_ref(),
            position: self.position.clone(),
            frame_count: self.frame_count,
        }
    }

    /// Releases this reference to the codec.
    pub fn dispose(&mut self) {
        self.codec.dispose();
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::native::NativeObject;
    use crate::object::{BoxState, FinalizationMode};

    #[derive(Debug)]
    struct Reel {
        next: u32,
        count: u32,
        deleted: bool,
    }

    impl NativeObject for Reel {
        fn delete(&mut self) {
            self.deleted = true;
        }

        fn is_deleted(&self) -> bool {
            self.deleted
        }
    }

    impl NativeCodec for Reel {
        type Frame = u32;

        fn frame_count(&self) -> u32 {
            self.count
        }

        fn decode_next_frame(&mut self) -> Result<u32, DecodeError> {
            let frame = self.next;
            self.next = (self.next + 1) % self.count;
            Ok(frame)
        }
    }

    /// The first byte is the frame count.
    #[derive(Debug, Default)]
    struct ReelDecoder {
        decodes: Rc<Cell<u32>>,
    }

    impl ImageDecoder for ReelDecoder {
        type Codec = Reel;

        fn decode(&self, bytes: &[u8]) -> Result<Reel, DecodeError> {
            let &[count, ..] = bytes else {
                return Err(DecodeError::InvalidData("empty input"));
            };
            self.decodes.set(self.decodes.get() + 1);
            Ok(Reel {
                next: 0,
                count: u32::from(count),
                deleted: false,
            })
        }
    }

    fn image(collector: &Collector, frames: u8) -> (AnimatedImage<ReelDecoder>, Rc<Cell<u32>>) {
        let decoder = ReelDecoder::default();
        let decodes = decoder.decodes.clone();
        let image = AnimatedImage::decode(collector, decoder, vec![frames, 0xAB]).unwrap();
        (image, decodes)
    }

    #[test]
    fn frames_wrap_around() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let (image, _) = image(&collector, 3);
        let frames: Vec<u32> = (0..5).map(|_| image.next_frame().unwrap()).collect();
        assert_eq!(frames, [0, 1, 2, 0, 1]);
        assert_eq!(image.position(), 2);
    }

    #[test]
    fn position_survives_eviction() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let (image, decodes) = image(&collector, 5);
        assert_eq!(image.next_frame().unwrap(), 0);
        assert_eq!(image.next_frame().unwrap(), 1);

        assert!(image.evict());
        assert!(image.box_ref().raw_native().is_none());
        assert_eq!(image.next_frame().unwrap(), 2);
        assert_eq!(decodes.get(), 2);
        assert_eq!(image.box_ref().resurrection_count(), 1);
    }

    #[test]
    fn clones_share_position() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let (mut image, _) = image(&collector, 4);
        let mut other = image.clone_ref();
        let _ = image.next_frame().unwrap();
        assert_eq!(other.next_frame().unwrap(), 1);
        image.dispose();
        other.dispose();
        assert_eq!(other.box_ref().state(), BoxState::PendingDeletion);
    }

    #[test]
    fn empty_input_is_rejected() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let err = AnimatedImage::decode(&collector, ReelDecoder::default(), Vec::<u8>::new())
            .unwrap_err();
        assert_eq!(err, DecodeError::InvalidData("empty input"));
        assert_eq!(collector.live_count(), 0);
    }

    #[test]
    fn image_without_frames_is_rejected() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let err = AnimatedImage::decode(&collector, ReelDecoder::default(), vec![0]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidData("image has no frames"));
    }
}
