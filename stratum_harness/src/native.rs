// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fake native objects.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;

use stratum_core::native::{
    BoxedRecipe, DecodeError, ImageDecoder, NativeCodec, NativeObject,
};

/// Counts native handles created and deleted.
#[derive(Debug, Default)]
pub struct Ledger {
    created: Cell<u32>,
    deleted: Cell<u32>,
}

impl Ledger {
    /// Creates a shared ledger.
    #[must_use]
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Returns how many handles were created.
    #[must_use]
    pub fn created(&self) -> u32 {
        self.created.get()
    }

    /// Returns how many handles were deleted.
    #[must_use]
    pub fn deleted(&self) -> u32 {
        self.deleted.get()
    }

    /// Returns how many handles are currently alive.
    #[must_use]
    pub fn alive(&self) -> u32 {
        self.created.get() - self.deleted.get()
    }

    fn record_create(&self) {
        self.created.set(self.created.get() + 1);
    }

    fn record_delete(&self) {
        self.deleted.set(self.deleted.get() + 1);
    }
}

/// A recorded picture, identified by `id`.
#[derive(Debug)]
pub struct FakePicture {
    id: u32,
    deleted: bool,
    ledger: Rc<Ledger>,
}

impl FakePicture {
    /// Records a picture.
    #[must_use]
    pub fn new(ledger: &Rc<Ledger>, id: u32) -> Self {
        ledger.record_create();
        Self {
            id,
            deleted: false,
            ledger: ledger.clone(),
        }
    }

    /// Returns a recipe that records picture `id` again.
    #[must_use]
    pub fn recipe(ledger: &Rc<Ledger>, id: u32) -> BoxedRecipe<Self> {
        let ledger = ledger.clone();
        Box::new(move || -> Result<Self, DecodeError> { Ok(Self::new(&ledger, id)) })
    }

    /// Returns the picture id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl NativeObject for FakePicture {
    fn delete(&mut self) {
        assert!(!self.deleted, "picture {} deleted twice", self.id);
        self.deleted = true;
        self.ledger.record_delete();
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Magic prefix understood by [`FakeDecoder`].
pub const MAGIC: &[u8; 4] = b"ANIM";

/// Encodes an animation of `frames` frames whose pixels derive from
/// `payload`: frame `i` is `payload` with `i` added (wrapping) to each byte.
#[must_use]
pub fn encode_animation(frames: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MAGIC.len() + 1 + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(frames);
    bytes.extend_from_slice(payload);
    bytes
}

/// Returns the pixels of frame `index` of an animation encoded by
/// [`encode_animation`].
#[must_use]
pub fn expected_frame(payload: &[u8], index: u32) -> Vec<u8> {
    // Frame indices above 255 wrap like the pixels do.
    let step = index.to_le_bytes()[0];
    payload.iter().map(|px| px.wrapping_add(step)).collect()
}

/// A multi-frame codec over an encoded animation.
#[derive(Debug)]
pub struct FakeCodec {
    payload: Rc<[u8]>,
    next: u32,
    frame_count: u32,
    deleted: bool,
    ledger: Rc<Ledger>,
}

impl NativeObject for FakeCodec {
    fn delete(&mut self) {
        assert!(!self.deleted, "codec deleted twice");
        self.deleted = true;
        self.ledger.record_delete();
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl NativeCodec for FakeCodec {
    type Frame = Vec<u8>;

    fn frame_count(&self) -> u32 {
        self.frame_count
    }

    fn decode_next_frame(&mut self) -> Result<Vec<u8>, DecodeError> {
        assert!(!self.deleted, "decode on a deleted codec");
        if self.frame_count == 0 {
            return Err(DecodeError::Frame(0));
        }
        let frame = expected_frame(&self.payload, self.next);
        self.next = (self.next + 1) % self.frame_count;
        Ok(frame)
    }
}

/// Decodes animations produced by [`encode_animation`].
#[derive(Clone, Debug)]
pub struct FakeDecoder {
    ledger: Rc<Ledger>,
    decodes: Rc<Cell<u32>>,
}

impl FakeDecoder {
    /// Creates a decoder recording codecs in `ledger`.
    #[must_use]
    pub fn new(ledger: &Rc<Ledger>) -> Self {
        Self {
            ledger: ledger.clone(),
            decodes: Rc::default(),
        }
    }

    /// Returns how many times bytes were decoded, across clones.
    #[must_use]
    pub fn decodes(&self) -> u32 {
        self.decodes.get()
    }
}

impl ImageDecoder for FakeDecoder {
    type Codec = FakeCodec;

    fn decode(&self, bytes: &[u8]) -> Result<FakeCodec, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::InvalidData("empty input"));
        }
        let Some(rest) = bytes.strip_prefix(MAGIC.as_slice()) else {
            return Err(DecodeError::UnsupportedFormat);
        };
        let Some((&frames, payload)) = rest.split_first() else {
            return Err(DecodeError::InvalidData("missing frame count"));
        };
        self.decodes.set(self.decodes.get() + 1);
        self.ledger.record_create();
        Ok(FakeCodec {
            payload: payload.into(),
            next: 0,
            frame_count: u32::from(frames),
            deleted: false,
            ledger: self.ledger.clone(),
        })
    }
}
