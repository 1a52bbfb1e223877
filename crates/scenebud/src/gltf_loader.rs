use std::sync::Arc;

use glam::{Quat, Vec3};
use tracing::warn;

use crate::material::{Color, Material, TextureData};
use crate::mesh::Geometry;
use crate::template::{ModelTemplate, TemplateMesh, TemplateNode};
use crate::world::Transform;

fn build_rgba(img: &gltf::image::Data) -> Option<Vec<u8>> {
    let rgba = match img.format {
        gltf::image::Format::R8 => img.pixels.iter().flat_map(|&r| [r, r, r, 255]).collect(),
        gltf::image::Format::R8G8 => img
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        gltf::image::Format::R8G8B8 => img
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        gltf::image::Format::R8G8B8A8 => img.pixels.clone(),
        gltf::image::Format::R16G16B16 => img
            .pixels
            .chunks_exact(6)
            .flat_map(|p| [p[1], p[3], p[5], 255])
            .collect(),
        gltf::image::Format::R16G16B16A16 => img
            .pixels
            .chunks_exact(8)
            .flat_map(|p| [p[1], p[3], p[5], p[7]])
            .collect(),
        other => {
            warn!("skipping texture with unhandled image format {other:?}");
            return None;
        }
    };
    Some(rgba)
}

fn load_material(
    prim: &gltf::Primitive<'_>,
    images: &[gltf::image::Data],
) -> (Material, Vec<Arc<TextureData>>) {
    let mat = prim.material();
    let pbr = mat.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();

    let mut material = Material::solid(
        mat.name().unwrap_or("gltf_material"),
        Color::new(r, g, b),
    );
    material.opacity = a;
    material.transparent = mat.alpha_mode() == gltf::material::AlphaMode::Blend || a < 1.0;

    // primitives without a material get the glTF default, which we treat
    // as unspecified so normalization can fill in our own defaults
    if mat.index().is_some() {
        material.roughness = Some(pbr.roughness_factor());
        material.metalness = Some(pbr.metallic_factor());
    }

    let maps = pbr
        .base_color_texture()
        .and_then(|info| {
            let img = images.get(info.texture().source().index())?;
            let pixels = build_rgba(img)?;
            Some(Arc::new(TextureData {
                label: format!("{}_basecolor", material.name),
                width: img.width,
                height: img.height,
                pixels: Arc::from(pixels),
            }))
        })
        .into_iter()
        .collect();

    (material, maps)
}

fn load_mesh(
    mesh: gltf::Mesh<'_>,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Vec<TemplateMesh> {
    let mut out = Vec::new();

    for prim in mesh.primitives() {
        if prim.mode() != gltf::mesh::Mode::Triangles {
            continue;
        }

        let reader = prim.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));

        let positions: Vec<Vec3> = match reader.read_positions() {
            Some(it) => it.map(Vec3::from).collect(),
            None => continue,
        };

        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|it| it.map(Vec3::from).collect())
            .unwrap_or_default();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(read) => read.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let (material, maps) = load_material(&prim, images);

        out.push(TemplateMesh {
            geometry: Arc::new(Geometry::new(positions, indices).with_normals(normals)),
            material,
            maps,
            cast_shadow: false,
            receive_shadow: false,
        });
    }

    out
}

fn load_node(
    node: gltf::Node<'_>,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> TemplateNode {
    let (t, r, s) = node.transform().decomposed();
    let local = Transform {
        translation: Vec3::from(t),
        rotation: Quat::from_array(r),
        scale: Vec3::from(s),
    };

    TemplateNode {
        name: node.name().unwrap_or("node").to_string(),
        local,
        meshes: node
            .mesh()
            .map(|m| load_mesh(m, buffers, images))
            .unwrap_or_default(),
        children: node
            .children()
            .map(|c| load_node(c, buffers, images))
            .collect(),
    }
}

/// Decode a glTF or GLB payload into an unnormalized template.
///
/// Uses the default scene when there is one; otherwise every mesh in
/// the document becomes a root node at the origin.
pub fn decode_gltf(bytes: &[u8], name: &str) -> Result<ModelTemplate, gltf::Error> {
    let (doc, buffers, images) = gltf::import_slice(bytes)?;

    let mut template = ModelTemplate::new(name);

    if let Some(scene) = doc.default_scene().or_else(|| doc.scenes().next()) {
        template.nodes = scene
            .nodes()
            .map(|n| load_node(n, &buffers, &images))
            .collect();
    } else {
        template.nodes = doc
            .meshes()
            .map(|m| TemplateNode {
                name: m.name().unwrap_or("mesh").to_string(),
                local: Transform::default(),
                meshes: load_mesh(m, &buffers, &images),
                children: Vec::new(),
            })
            .collect();
    }

    Ok(template)
}
