//! Physical resource realisation and cross-frame caching (§4.4).
//!
//! `Registry` is the only place a virtual resource touches the `Device`. It
//! is long-lived across frames (unlike `Scheduler`, which is rebuilt every
//! frame) so a texture whose descriptor and resolved size are unchanged
//! frame-to-frame is realised once and reused, keyed by `(name, resolved
//! width, resolved height, and the descriptor fields that determine the
//! physical resource's shape)` per spec §4.4's "(descriptor, resolution)"
//! cache key. When the render or viewport resolution changes, or the
//! descriptor itself changes under an unchanged name, the cached entry is
//! invalidated; the old physical object is destroyed only after the new one
//! is created, mirroring the source engine's create-then-destroy ordering on
//! a resize so a renderer never observes a frame with zero valid targets
//! for a resource it's about to recreate.
//!
//! `Registry` and the resolve methods a pass callback needs are `pub`: per
//! spec §2, `Graph::execute` "invokes each callback with the Registry,
//! which resolves handles to physical objects," so a callback outside this
//! crate must be able to call `resolve_texture`/`resolve_view` on the
//! reference it's handed.

use crate::device::{Device, PhysicalTexture, PhysicalView};
use crate::error::{RenderGraphError, Result};
use crate::resource::{Extent, Format, TextureDesc, TextureDimension, UsageFlags, ViewDesc, ViewKind};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    width: u32,
    height: u32,
    dimension: TextureDimension,
    format: Format,
    mip_levels: u32,
    array_layers: u32,
    usage: UsageFlags,
}

struct CachedTexture {
    physical: PhysicalTexture,
    key: CacheKey,
    views: HashMap<ViewCacheKey, PhysicalView>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct ViewCacheKey {
    kind: ViewKind,
    base_mip: u32,
    mip_count: u32,
    base_array_slice: u32,
    array_count: u32,
    srgb: Option<bool>,
}

pub struct Registry<D: Device> {
    device: D,
    by_name: HashMap<String, CachedTexture>,
}

fn resolve_extent(extent: Extent, render: (u32, u32), viewport: (u32, u32)) -> (u32, u32) {
    match extent {
        Extent::Render => render,
        Extent::Viewport => viewport,
        Extent::Fixed { width, height } => (width, height),
    }
}

impl<D: Device> Registry<D> {
    pub(crate) fn new(device: D) -> Self {
        Self {
            device,
            by_name: HashMap::new(),
        }
    }

    /// Realises (or reuses) the physical texture backing `name`/`desc` at
    /// the given render/viewport resolution. The cache key folds in the
    /// descriptor fields that determine the physical resource's shape, so a
    /// format/dimension/mip/array/usage change under an unchanged name and
    /// resolution is treated the same as a resolution change: the old
    /// physical object, if any, is destroyed only once its replacement
    /// exists.
    pub fn resolve_texture(
        &mut self,
        name: &str,
        desc: &TextureDesc,
        render_resolution: (u32, u32),
        viewport_resolution: (u32, u32),
    ) -> Result<PhysicalTexture> {
        let (width, height) = resolve_extent(desc.extent, render_resolution, viewport_resolution);
        let key = CacheKey {
            name: name.to_string(),
            width,
            height,
            dimension: desc.dimension,
            format: desc.format,
            mip_levels: desc.mip_levels,
            array_layers: desc.array_layers,
            usage: desc.usage,
        };

        if let Some(cached) = self.by_name.get(name) {
            if cached.key == key {
                return Ok(cached.physical);
            }
        }

        let physical = self
            .device
            .create_texture(desc)
            .map_err(|e| RenderGraphError::ResourceUnavailable {
                resource: name.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(stale) = self.by_name.insert(
            name.to_string(),
            CachedTexture {
                physical,
                key,
                views: HashMap::new(),
            },
        ) {
            log::debug!("registry: {name} recreated ({width}x{height}, descriptor changed or resized)");
            self.device.destroy(stale.physical);
        }

        Ok(physical)
    }

    pub fn resolve_view(
        &mut self,
        resource_name: &str,
        desc: &ViewDesc,
        texture: PhysicalTexture,
    ) -> Result<PhysicalView> {
        let view_key = ViewCacheKey {
            kind: desc.kind,
            base_mip: desc.base_mip,
            mip_count: desc.mip_count,
            base_array_slice: desc.base_array_slice,
            array_count: desc.array_count,
            srgb: desc.srgb,
        };

        if let Some(cached) = self.by_name.get(resource_name) {
            if let Some(&view) = cached.views.get(&view_key) {
                return Ok(view);
            }
        }

        let view = self.device.create_view(desc, texture).map_err(|e| {
            RenderGraphError::ResourceUnavailable {
                resource: resource_name.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Some(cached) = self.by_name.get_mut(resource_name) {
            cached.views.insert(view_key, view);
        }

        Ok(view)
    }

    /// Drops every cached physical object whose name is not in `keep`.
    /// Called once a frame after compiling, so a resource a renderer
    /// stopped declaring is released rather than retained forever.
    pub(crate) fn retain(&mut self, keep: &[&str]) {
        let stale: Vec<String> = self
            .by_name
            .keys()
            .filter(|name| !keep.contains(&name.as_str()))
            .cloned()
            .collect();
        for name in stale {
            if let Some(cached) = self.by_name.remove(&name) {
                log::debug!("registry: releasing {name}, no longer declared");
                self.device.destroy(cached.physical);
            }
        }
    }

    pub(crate) fn device(&self) -> &D {
        &self.device
    }
}
