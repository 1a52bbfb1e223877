//! Floor, walls, ceiling and openings of the room.

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use scenebud::glam::{Quat, Vec3};
use scenebud::{Color, Geometry, Material, MaterialId, MeshBinding, NodeId, Transform, World};
use tracing::{debug, error, info};

use crate::room::{Opening, OpeningKind, RoomDimensions, Wall};

const CEILING_COLOR: Color = Color::new(0.98, 0.98, 0.98);
const FRAME_COLOR: Color = Color::new(0.95, 0.95, 0.93);
const DOOR_COLOR: Color = Color::new(0.55, 0.38, 0.24);
const HANDLE_COLOR: Color = Color::new(0.75, 0.75, 0.72);
const GLASS_COLOR: Color = Color::new(0.7, 0.85, 0.95);
const GLASS_OPACITY: f32 = 0.35;

const FRAME_WIDTH: f32 = 0.06;
const FRAME_DEPTH: f32 = 0.08;
const PANEL_THICKNESS: f32 = 0.04;
const SILL_DEPTH: f32 = 0.15;
const SILL_HEIGHT: f32 = 0.04;

/// Where an opening's local frame sits for a given wall: origin on the
/// floor at the opening's center, local +Z pointing into the room.
pub fn opening_transform(opening: &Opening, dims: &RoomDimensions) -> Transform {
    let (hw, hl) = dims.half_extents();
    let pos = opening.position;
    let (translation, yaw) = match opening.wall {
        Wall::North => (Vec3::new(pos - hw, 0.0, -hl), 0.0),
        Wall::South => (Vec3::new(pos - hw, 0.0, hl), PI),
        Wall::East => (Vec3::new(hw, 0.0, pos - hl), -FRAC_PI_2),
        Wall::West => (Vec3::new(-hw, 0.0, pos - hl), FRAC_PI_2),
    };
    Transform::from_translation_yaw(translation, yaw)
}

struct AttachedOpening {
    opening: Opening,
    node: NodeId,
}

/// The static room geometry. Every node lives under one root so the
/// whole shell can be torn down at once.
pub struct RoomShell {
    root: NodeId,
    floor: NodeId,
    walls: [NodeId; 4],
    ceiling: NodeId,
    openings_root: NodeId,
    openings: Vec<AttachedOpening>,
    wall_material_ids: [MaterialId; 4],
    floor_material: MaterialId,
    dimensions: RoomDimensions,
    wall_color: Color,
    floor_color: Color,
    floor_thickness: f32,
}

fn solid(world: &mut World, geometry: Geometry, material: Material) -> MeshBinding {
    MeshBinding {
        geometry: world.resources.add_geometry(Arc::new(geometry)),
        material: world.resources.add_material(material),
        cast_shadow: false,
        receive_shadow: true,
    }
}

impl RoomShell {
    pub fn build(
        world: &mut World,
        dimensions: RoomDimensions,
        wall_color: Color,
        floor_color: Color,
        floor_thickness: f32,
    ) -> Self {
        let root = world.create_group("room", Transform::default(), None);
        let parts = build_parts(world, root, &dimensions, wall_color, floor_color, floor_thickness);
        let openings_root = world.create_group("openings", Transform::default(), Some(root));

        info!(
            "built room shell {}x{}x{}",
            dimensions.width, dimensions.length, dimensions.height
        );

        Self {
            root,
            floor: parts.floor,
            walls: parts.walls,
            ceiling: parts.ceiling,
            openings_root,
            openings: Vec::new(),
            wall_material_ids: parts.wall_materials,
            floor_material: parts.floor_material,
            dimensions,
            wall_color,
            floor_color,
            floor_thickness,
        }
    }

    /// Tear down the old shell and build one for new dimensions. Colors
    /// and openings carry over.
    pub fn rebuild(&mut self, world: &mut World, dimensions: RoomDimensions) {
        let openings: Vec<Opening> = self.openings().cloned().collect();
        let fresh = Self::build(
            world,
            dimensions,
            self.wall_color,
            self.floor_color,
            self.floor_thickness,
        );
        let old = std::mem::replace(self, fresh);
        old.dispose(world);
        self.set_openings(world, &openings);
    }

    /// Recolor walls in place. Geometry is untouched.
    pub fn set_wall_color(&mut self, world: &mut World, color: Color) {
        self.wall_color = color;
        for id in self.wall_material_ids {
            if let Some(material) = world.resources.material_mut(id) {
                material.base_color = color;
            }
        }
    }

    pub fn set_floor_color(&mut self, world: &mut World, color: Color) {
        self.floor_color = color;
        if let Some(material) = world.resources.material_mut(self.floor_material) {
            material.base_color = color;
        }
    }

    /// Replace every attached door and window.
    pub fn set_openings(&mut self, world: &mut World, openings: &[Opening]) {
        for attached in self.openings.drain(..) {
            if world.remove_node(attached.node).is_none() {
                error!("opening '{}' was already gone", attached.opening.id);
                debug_assert!(false, "opening node disposed twice");
            }
        }

        for opening in openings {
            let node = build_opening(world, opening, &self.dimensions, self.openings_root);
            self.openings.push(AttachedOpening {
                opening: opening.clone(),
                node,
            });
        }
        debug!("attached {} openings", self.openings.len());
    }

    /// Remove the whole shell from the world.
    pub fn dispose(self, world: &mut World) {
        if let Some(report) = world.remove_node(self.root) {
            debug!(
                "disposed room shell: {} nodes, {} geometries, {} materials",
                report.nodes, report.geometries, report.materials
            );
        } else {
            error!("room shell root was already disposed");
            debug_assert!(false, "room shell disposed twice");
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn floor(&self) -> NodeId {
        self.floor
    }

    pub fn walls(&self) -> [NodeId; 4] {
        self.walls
    }

    pub fn ceiling(&self) -> NodeId {
        self.ceiling
    }

    pub fn dimensions(&self) -> RoomDimensions {
        self.dimensions
    }

    pub fn wall_color(&self) -> Color {
        self.wall_color
    }

    pub fn floor_color(&self) -> Color {
        self.floor_color
    }

    /// Height of the walkable floor surface.
    pub fn floor_thickness(&self) -> f32 {
        self.floor_thickness
    }

    pub fn opening_count(&self) -> usize {
        self.openings.len()
    }

    pub fn opening_node(&self, id: &str) -> Option<NodeId> {
        self.openings
            .iter()
            .find(|o| o.opening.id == id)
            .map(|o| o.node)
    }

    /// Openings currently attached, in the order they were given.
    pub fn openings(&self) -> impl Iterator<Item = &Opening> {
        self.openings.iter().map(|o| &o.opening)
    }
}

struct ShellParts {
    floor: NodeId,
    walls: [NodeId; 4],
    ceiling: NodeId,
    wall_materials: [MaterialId; 4],
    floor_material: MaterialId,
}

fn build_parts(
    world: &mut World,
    root: NodeId,
    dims: &RoomDimensions,
    wall_color: Color,
    floor_color: Color,
    floor_thickness: f32,
) -> ShellParts {
    let (hw, hl) = dims.half_extents();
    let h = dims.height;

    // floor slab, top face at y = floor_thickness
    let floor_mesh = solid(
        world,
        Geometry::cuboid(dims.width, floor_thickness, dims.length),
        Material::solid("floor", floor_color).with_roughness(0.8),
    );
    let floor_material = floor_mesh.material;
    let floor = world.create_mesh(
        "floor",
        floor_mesh,
        Transform::from_translation(Vec3::new(0.0, floor_thickness * 0.5, 0.0)),
        Some(root),
    );

    // planes face +Z; rotate each so it faces into the room
    let wall_layout = [
        ("wall_north", dims.width, Vec3::new(0.0, h * 0.5, -hl), 0.0),
        ("wall_south", dims.width, Vec3::new(0.0, h * 0.5, hl), PI),
        ("wall_east", dims.length, Vec3::new(hw, h * 0.5, 0.0), -FRAC_PI_2),
        ("wall_west", dims.length, Vec3::new(-hw, h * 0.5, 0.0), FRAC_PI_2),
    ];

    let mut walls = [root; 4];
    let mut wall_materials = [floor_material; 4];
    for (i, (name, span, at, yaw)) in wall_layout.into_iter().enumerate() {
        let mesh = solid(
            world,
            Geometry::plane(span, h),
            Material::solid(name, wall_color).with_roughness(0.9),
        );
        wall_materials[i] = mesh.material;
        walls[i] = world.create_mesh(name, mesh, Transform::from_translation_yaw(at, yaw), Some(root));
    }
    let ceiling_mesh = solid(
        world,
        Geometry::plane(dims.width, dims.length),
        Material::solid("ceiling", CEILING_COLOR),
    );
    let ceiling = world.create_mesh(
        "ceiling",
        ceiling_mesh,
        Transform {
            translation: Vec3::new(0.0, h, 0.0),
            rotation: Quat::from_rotation_x(FRAC_PI_2),
            scale: Vec3::ONE,
        },
        Some(root),
    );

    ShellParts {
        floor,
        walls,
        ceiling,
        wall_materials,
        floor_material,
    }
}

fn build_opening(world: &mut World, opening: &Opening, dims: &RoomDimensions, parent: NodeId) -> NodeId {
    let group = world.create_group(
        format!("opening:{}", opening.id),
        opening_transform(opening, dims),
        Some(parent),
    );

    match opening.kind {
        OpeningKind::Door => build_door(world, opening, group),
        OpeningKind::Window { sill_height } => build_window(world, opening, sill_height, group),
    }

    group
}

fn frame_bar(world: &mut World, name: &str, size: Vec3, at: Vec3, parent: NodeId) -> NodeId {
    let mesh = solid(
        world,
        Geometry::cuboid(size.x, size.y, size.z),
        Material::solid(name, FRAME_COLOR),
    );
    world.create_mesh(name, mesh, Transform::from_translation(at), Some(parent))
}

fn build_door(world: &mut World, opening: &Opening, group: NodeId) {
    let (w, h) = (opening.width, opening.height);
    let z = FRAME_DEPTH * 0.5;

    let frame = world.create_group("frame", Transform::default(), Some(group));
    let jamb = Vec3::new(FRAME_WIDTH, h, FRAME_DEPTH);
    frame_bar(world, "jamb_left", jamb, Vec3::new(-w * 0.5, h * 0.5, z), frame);
    frame_bar(world, "jamb_right", jamb, Vec3::new(w * 0.5, h * 0.5, z), frame);
    frame_bar(
        world,
        "head",
        Vec3::new(w + FRAME_WIDTH, FRAME_WIDTH, FRAME_DEPTH),
        Vec3::new(0.0, h, z),
        frame,
    );

    let panel_mesh = solid(
        world,
        Geometry::cuboid(w - FRAME_WIDTH, h - FRAME_WIDTH * 0.5, PANEL_THICKNESS),
        Material::solid("door_panel", DOOR_COLOR).with_roughness(0.6),
    );
    world.create_mesh(
        "panel",
        panel_mesh,
        Transform::from_translation(Vec3::new(0.0, (h - FRAME_WIDTH * 0.5) * 0.5, z)),
        Some(group),
    );

    let handle = world.create_group(
        "handle",
        Transform::from_translation(Vec3::new(w * 0.35, h * 0.48, z + PANEL_THICKNESS)),
        Some(group),
    );
    let knob_mesh = solid(
        world,
        Geometry::cuboid(0.12, 0.03, 0.05),
        Material::solid("door_handle", HANDLE_COLOR)
            .with_roughness(0.3)
            .with_metalness(0.9),
    );
    world.create_mesh("knob", knob_mesh, Transform::default(), Some(handle));
}

fn build_window(world: &mut World, opening: &Opening, sill_height: f32, group: NodeId) {
    let (w, h) = (opening.width, opening.height);
    let z = FRAME_DEPTH * 0.5;

    let body = world.create_group(
        "window",
        Transform::from_translation(Vec3::new(0.0, sill_height, 0.0)),
        Some(group),
    );

    let frame = world.create_group("frame", Transform::default(), Some(body));
    let side = Vec3::new(FRAME_WIDTH, h, FRAME_DEPTH);
    let span = Vec3::new(w + FRAME_WIDTH, FRAME_WIDTH, FRAME_DEPTH);
    frame_bar(world, "bar_left", side, Vec3::new(-w * 0.5, h * 0.5, z), frame);
    frame_bar(world, "bar_right", side, Vec3::new(w * 0.5, h * 0.5, z), frame);
    frame_bar(world, "bar_top", span, Vec3::new(0.0, h, z), frame);
    frame_bar(world, "bar_bottom", span, Vec3::new(0.0, 0.0, z), frame);

    let mut glass = Material::solid("window_glass", GLASS_COLOR)
        .with_roughness(0.05)
        .with_opacity(GLASS_OPACITY);
    glass.metalness = Some(0.0);
    let glass_mesh = MeshBinding {
        cast_shadow: false,
        receive_shadow: false,
        ..solid(world, Geometry::plane(w, h), glass)
    };
    world.create_mesh(
        "glass",
        glass_mesh,
        Transform::from_translation(Vec3::new(0.0, h * 0.5, z)),
        Some(body),
    );

    frame_bar(
        world,
        "sill",
        Vec3::new(w + FRAME_WIDTH * 2.0, SILL_HEIGHT, SILL_DEPTH),
        Vec3::new(0.0, -SILL_HEIGHT * 0.5, SILL_DEPTH * 0.5),
        body,
    );
}
