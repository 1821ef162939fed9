// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor: one collector, one surface pool, one retained tree and
//! the host document, driven frame by frame.

use core::fmt;

use kurbo::Size;

use crate::host::ElementHost;
use crate::native::NativeObject;
use crate::object::{Collector, DEFAULT_CACHE_CAPACITY, FinalizationMode, SweepReport};
use crate::persisted::{RetainReport, SurfaceTree};
use crate::scene::Scene;
use crate::surface::{
    DEFAULT_SURFACE_CAPACITY, PictureTarget, RenderTarget, SurfaceFactory, SurfaceProvider,
};
use crate::trace::Tracer;

/// Construction parameters of a [`Compositor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositorConfig {
    /// Capacity of the surface pool (base surface included, backup
    /// excluded). Must be at least 1.
    pub surface_capacity: usize,
    /// Whether dropped, undisposed wrappers are reclaimed by the collector.
    pub finalization: FinalizationMode,
    /// Number of resurrectable native handles kept resident. Must be at
    /// least 1.
    pub resurrection_cache_capacity: usize,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            surface_capacity: DEFAULT_SURFACE_CAPACITY,
            finalization: FinalizationMode::Automatic,
            resurrection_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// What a [`Compositor::hot_restart`] reclaimed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HotRestartReport {
    /// Persisted nodes released.
    pub nodes_released: u32,
    /// Boxes permanently deleted by the collector reset.
    pub boxes_reclaimed: usize,
    /// Rendering targets disposed by the surface pool reset.
    pub surfaces_disposed: usize,
}

/// Owns the lifetime machinery of one window.
///
/// The base surface is attached to the host's root element on construction
/// and again after every hot restart.
pub struct Compositor<P, S, H>
where
    P: NativeObject + 'static,
    S: SurfaceProvider,
    H: ElementHost,
{
    config: CompositorConfig,
    collector: Collector,
    factory: SurfaceFactory<S>,
    tree: SurfaceTree<P>,
    host: H,
}

impl<P, S, H> fmt::Debug for Compositor<P, S, H>
where
    P: NativeObject + 'static,
    S: SurfaceProvider,
    H: ElementHost,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compositor")
            .field("config", &self.config)
            .field("collector", &self.collector)
            .field("factory", &self.factory)
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

impl<P, S, H> Compositor<P, S, H>
where
    P: NativeObject + 'static,
    S: SurfaceProvider,
    H: ElementHost,
{
    /// Creates a compositor drawing through `provider` into `host`.
    ///
    /// # Panics
    ///
    /// Panics if either capacity in `config` is zero.
    #[must_use]
    pub fn new(provider: S, host: H, config: CompositorConfig) -> Self {
        let collector =
            Collector::with_cache_capacity(config.finalization, config.resurrection_cache_capacity);
        let factory = SurfaceFactory::new(provider, config.surface_capacity);
        let tree = SurfaceTree::new(host.root());
        let mut compositor = Self {
            config,
            collector,
            factory,
            tree,
            host,
        };
        compositor.attach_base();
        compositor
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Returns the collector that boxes for this compositor must be created
    /// with.
    #[must_use]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Returns the surface pool.
    #[must_use]
    pub fn factory(&self) -> &SurfaceFactory<S> {
        &self.factory
    }

    /// Returns the retained tree.
    #[must_use]
    pub fn tree(&self) -> &SurfaceTree<P> {
        &self.tree
    }

    /// Returns the host document.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host document mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Retains `scene` and paints what changed.
    pub fn draw_frame(
        &mut self,
        scene: Scene<P>,
        viewport: Size,
        tracer: &mut Tracer<'_>,
    ) -> RetainReport
    where
        S::Target: PictureTarget<P>,
    {
        self.tree
            .retain(scene, viewport, &mut self.factory, &mut self.host, tracer)
    }

    /// Runs a collection pass.
    pub fn collect(&self, tracer: &mut Tracer<'_>) -> SweepReport {
        self.collector.collect(tracer)
    }

    /// Drops all retained state and rebuilds the surface pool.
    ///
    /// The tree is cleared first so its references go through the normal
    /// release path, then every box still registered is reclaimed and every
    /// rendering target disposed. Surface ids and boxes created before the
    /// restart must not be used afterwards.
    pub fn hot_restart(&mut self, tracer: &mut Tracer<'_>) -> HotRestartReport {
        let nodes_released = self.tree.clear(&mut self.factory, &mut self.host, tracer);
        let boxes_reclaimed = self.collector.reset(tracer);
        let surfaces_disposed = self.factory.reset();
        self.attach_base();
        let report = HotRestartReport {
            nodes_released,
            boxes_reclaimed,
            surfaces_disposed,
        };
        log::debug!("hot restart: {report:?}");
        report
    }

    fn attach_base(&mut self) {
        let base = self.factory.base_surface();
        self.factory.surface_mut(base).add_to_scene();
        let root = self.host.root();
        self.host.attach_surface(root, base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CompositorConfig::default();
        assert_eq!(config.surface_capacity, 8);
        assert_eq!(config.finalization, FinalizationMode::Automatic);
        assert_eq!(config.resurrection_cache_capacity, 256);
    }
}
