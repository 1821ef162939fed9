// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fake host document.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::mem;

use stratum_core::host::{ElementHost, ElementId, StyleUpdate};
use stratum_core::scene::OpKind;
use stratum_core::surface::SurfaceId;

/// One mutation applied to a [`FakeDom`].
#[derive(Clone, Debug, PartialEq)]
pub enum DomOp {
    /// An element was created.
    Create(ElementId, OpKind),
    /// `child` was appended to `parent`.
    Append {
        /// The new parent.
        parent: ElementId,
        /// The appended element.
        child: ElementId,
    },
    /// An element and its descendants were removed.
    Remove(ElementId),
    /// A style property was written.
    Style(ElementId, StyleUpdate),
    /// A rendering target was placed in an element.
    Attach(ElementId, SurfaceId),
}

/// An element of a [`FakeDom`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Kind of node the element was created for (`None` for the root).
    pub kind: Option<OpKind>,
    /// Parent element, if attached.
    pub parent: Option<ElementId>,
    /// Children in document order.
    pub children: Vec<ElementId>,
    /// Latest style written, per property, in first-written order.
    pub styles: Vec<StyleUpdate>,
    /// Attached rendering targets.
    pub surfaces: Vec<SurfaceId>,
}

impl Element {
    /// Returns the latest opacity written, if any.
    #[must_use]
    pub fn opacity(&self) -> Option<f32> {
        self.styles.iter().find_map(|style| match style {
            StyleUpdate::Opacity(alpha) => Some(*alpha),
            _ => None,
        })
    }
}

/// An element tree that records every mutation.
#[derive(Debug)]
pub struct FakeDom {
    elements: BTreeMap<ElementId, Element>,
    next: u32,
    log: Vec<DomOp>,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    /// The root element.
    pub const ROOT: ElementId = ElementId(0);

    /// Creates a document holding only the root element.
    #[must_use]
    pub fn new() -> Self {
        let mut elements = BTreeMap::new();
        elements.insert(Self::ROOT, Element::default());
        Self {
            elements,
            next: 1,
            log: Vec::new(),
        }
    }

    /// Returns an element, if it is in the document.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Returns the children of an element.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not in the document.
    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.get(id).children
    }

    /// Returns the number of elements, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns whether only the root is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.len() == 1
    }

    /// Returns the mutations recorded since the last
    /// [`take_log`](Self::take_log).
    #[must_use]
    pub fn log(&self) -> &[DomOp] {
        &self.log
    }

    /// Returns and clears the mutation log.
    pub fn take_log(&mut self) -> Vec<DomOp> {
        mem::take(&mut self.log)
    }

    fn get(&self, id: ElementId) -> &Element {
        match self.elements.get(&id) {
            Some(element) => element,
            None => panic!("{id:?} is not in the document"),
        }
    }

    fn get_mut(&mut self, id: ElementId) -> &mut Element {
        match self.elements.get_mut(&id) {
            Some(element) => element,
            None => panic!("{id:?} is not in the document"),
        }
    }

    fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.get_mut(id).parent.take() {
            self.get_mut(parent).children.retain(|&c| c != id);
        }
    }
}

impl ElementHost for FakeDom {
    fn root(&self) -> ElementId {
        Self::ROOT
    }

    fn create_element(&mut self, kind: OpKind) -> ElementId {
        let id = ElementId(self.next);
        self.next += 1;
        self.elements.insert(
            id,
            Element {
                kind: Some(kind),
                ..Element::default()
            },
        );
        self.log.push(DomOp::Create(id, kind));
        id
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        assert!(parent != child, "cannot append {child:?} to itself");
        self.detach(child);
        self.get_mut(parent).children.push(child);
        self.get_mut(child).parent = Some(parent);
        self.log.push(DomOp::Append { parent, child });
    }

    fn remove_element(&mut self, element: ElementId) {
        assert!(element != Self::ROOT, "cannot remove the root element");
        self.detach(element);
        let mut stack = Vec::from([element]);
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.elements.remove(&id) {
                stack.extend(removed.children);
            }
        }
        self.log.push(DomOp::Remove(element));
    }

    fn set_style(&mut self, element: ElementId, style: &StyleUpdate) {
        let styles = &mut self.get_mut(element).styles;
        match styles
            .iter_mut()
            .find(|old| mem::discriminant(&**old) == mem::discriminant(style))
        {
            Some(old) => *old = style.clone(),
            None => styles.push(style.clone()),
        }
        self.log.push(DomOp::Style(element, style.clone()));
    }

    fn attach_surface(&mut self, element: ElementId, surface: SurfaceId) {
        self.get_mut(element).surfaces.push(surface);
        self.log.push(DomOp::Attach(element, surface));
    }
}
