use std::collections::HashMap;
use std::sync::Arc;

use crate::material::{Material, TextureData};
use crate::mesh::Geometry;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GeometryId(u64);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MaterialId(u64);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(u64);

/// Number of live resources of each kind.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ResourceCounts {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

/// What a removal released.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct DisposeReport {
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl DisposeReport {
    pub fn merge(&mut self, other: DisposeReport) {
        self.nodes += other.nodes;
        self.geometries += other.geometries;
        self.materials += other.materials;
        self.textures += other.textures;
    }
}

/// Registry of the geometry, materials and textures that scene nodes
/// reference. Anything registered here stays alive until disposed.
///
/// Geometry and texture payloads are reference counted so that many
/// instances of the same template can share the bytes while still
/// holding their own handles.
#[derive(Default)]
pub struct Resources {
    next_id: u64,
    geometries: HashMap<GeometryId, Arc<Geometry>>,
    materials: HashMap<MaterialId, Material>,
    textures: HashMap<TextureId, Arc<TextureData>>,
}

impl Resources {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_geometry(&mut self, geometry: Arc<Geometry>) -> GeometryId {
        let id = GeometryId(self.next());
        self.geometries.insert(id, geometry);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next());
        self.materials.insert(id, material);
        id
    }

    pub fn add_texture(&mut self, texture: Arc<TextureData>) -> TextureId {
        let id = TextureId(self.next());
        self.textures.insert(id, texture);
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id).map(|g| g.as_ref())
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureData> {
        self.textures.get(&id).map(|t| t.as_ref())
    }

    pub fn dispose_geometry(&mut self, id: GeometryId) -> bool {
        self.geometries.remove(&id).is_some()
    }

    pub fn dispose_texture(&mut self, id: TextureId) -> bool {
        self.textures.remove(&id).is_some()
    }

    /// Dispose a material and every texture map it owns.
    /// Returns the number of textures released, or None if the
    /// material was already gone.
    pub fn dispose_material(&mut self, id: MaterialId) -> Option<usize> {
        let material = self.materials.remove(&id)?;
        let released = material
            .maps
            .iter()
            .filter(|map| self.dispose_texture(**map))
            .count();
        Some(released)
    }

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            geometries: self.geometries.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Color;

    fn texture() -> Arc<TextureData> {
        Arc::new(TextureData {
            label: "t".to_string(),
            width: 1,
            height: 1,
            pixels: Arc::from(vec![255u8, 255, 255, 255]),
        })
    }

    #[test]
    fn disposing_material_releases_its_maps() {
        let mut res = Resources::default();
        let t1 = res.add_texture(texture());
        let t2 = res.add_texture(texture());
        let mut mat = Material::solid("m", Color::WHITE);
        mat.maps = vec![t1, t2];
        let m = res.add_material(mat);

        assert_eq!(res.counts().textures, 2);
        assert_eq!(res.dispose_material(m), Some(2));
        assert_eq!(res.counts(), ResourceCounts::default());
    }

    #[test]
    fn double_dispose_is_noop() {
        let mut res = Resources::default();
        let g = res.add_geometry(Arc::new(Geometry::plane(1.0, 1.0)));
        let m = res.add_material(Material::solid("m", Color::WHITE));

        assert!(res.dispose_geometry(g));
        assert!(!res.dispose_geometry(g));
        assert_eq!(res.dispose_material(m), Some(0));
        assert_eq!(res.dispose_material(m), None);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut res = Resources::default();
        let a = res.add_material(Material::solid("a", Color::WHITE));
        res.dispose_material(a);
        let b = res.add_material(Material::solid("b", Color::WHITE));
        assert_ne!(a, b);
        assert!(res.material(a).is_none());
    }
}
