//! Heterogeneous, type-keyed pass-local parameter bundle (§4.2).
//!
//! The source keys this table by the host language's runtime type
//! identity token; per the REDESIGN FLAGS that scheme isn't reproduced
//! directly. Each plain-old-data parameter type is instead looked up
//! through a trait-object table keyed by `TypeId` (Rust's own, safe,
//! compiler-assigned type tag) and downcast with `Any` — no unsafe
//! reinterpretation of raw bytes is involved, unlike the arena-backed
//! `std::type_index` table in the source.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Every `PassScope` pre-creates this entry so a pass body can read the
/// frame's resolution without separately threading it through.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewData {
    pub render_width: u32,
    pub render_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

pub struct PassScope {
    data: HashMap<TypeId, Box<dyn Any>>,
}

impl PassScope {
    pub(crate) fn new(view_data: ViewData) -> Self {
        let mut scope = Self {
            data: HashMap::new(),
        };
        *scope.get_mut::<ViewData>() = view_data;
        scope
    }

    /// Returns a stable mutable reference to the zero-initialised (i.e.
    /// `Default`) instance of `T`, constructing it on first access.
    pub fn get_mut<T: Default + 'static>(&mut self) -> &mut T {
        self.data
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("PassScope: type tag collision, this is a bug")
    }

    pub fn get<T: Default + 'static>(&self) -> Option<&T> {
        self.data.get(&TypeId::of::<T>()).and_then(|b| b.downcast_ref::<T>())
    }
}
