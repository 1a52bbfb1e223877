use glam::{Mat4, Quat, Vec3};

use crate::camera::Camera;
use crate::mesh::Aabb;
use crate::ray::Ray;
use crate::resources::{DisposeReport, GeometryId, MaterialId, Resources};

/// A unique handle for a node in the scene graph.
/// Uses arena index + generation to prevent stale handle reuse.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId {
    pub index: u32,
    pub generation: u32,
}

/// Transform for a scene node (position, rotation, scale).
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(t: Vec3) -> Self {
        Self {
            translation: t,
            ..Default::default()
        }
    }

    pub fn from_translation_yaw(t: Vec3, yaw: f32) -> Self {
        Self {
            translation: t,
            rotation: Quat::from_rotation_y(yaw),
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

/// Geometry + material pair drawn at a node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MeshBinding {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// A node in the scene graph.
pub struct Node {
    pub name: String,

    /// Local transform relative to parent (or world if root).
    pub local: Transform,

    pub visible: bool,

    /// Cached world-space matrix. Valid when `dirty == false`.
    world_matrix: Mat4,

    /// When true, world_matrix needs recomputation.
    dirty: bool,

    /// Generation for this slot (matches NodeId.generation when alive).
    generation: u32,

    /// Parent node. None means this is a root node.
    parent: Option<NodeId>,

    /// First child (intrusive linked list through siblings).
    first_child: Option<NodeId>,

    /// Next sibling in parent's child list.
    next_sibling: Option<NodeId>,

    /// If Some, this node draws a mesh. Grouping nodes have None.
    pub mesh: Option<MeshBinding>,

    /// Whether this slot is occupied.
    alive: bool,
}

impl Node {
    /// Get the cached world-space matrix.
    /// Only valid after `update_world_transforms()`.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Closest ray hit against a set of subtrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// The subtree root the hit mesh belongs to.
    pub root: NodeId,
    /// The mesh node that was actually hit.
    pub node: NodeId,
    pub distance: f32,
    pub point: Vec3,
}

pub struct World {
    pub camera: Camera,

    /// Geometry, materials and textures referenced by mesh nodes.
    pub resources: Resources,

    /// Arena of all nodes.
    nodes: Vec<Node>,

    /// Free slot indices for reuse.
    free_list: Vec<u32>,

    /// Cached list of NodeIds that draw a mesh.
    /// Rebuilt when renderables_dirty is true.
    renderables: Vec<NodeId>,

    /// True when renderables list needs rebuilding.
    renderables_dirty: bool,
}

impl World {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            resources: Resources::default(),
            nodes: Vec::new(),
            free_list: Vec::new(),
            renderables: Vec::new(),
            renderables_dirty: false,
        }
    }

    // ── Arena internals ──────────────────────────────────────────

    fn alloc_slot(&mut self) -> (u32, u32) {
        if let Some(index) = self.free_list.pop() {
            let node = &mut self.nodes[index as usize];
            node.generation += 1;
            node.alive = true;
            node.dirty = true;
            node.visible = true;
            node.name.clear();
            node.parent = None;
            node.first_child = None;
            node.next_sibling = None;
            node.mesh = None;
            node.world_matrix = Mat4::IDENTITY;
            (index, node.generation)
        } else {
            let index = self.nodes.len() as u32;
            self.nodes.push(Node {
                name: String::new(),
                local: Transform::default(),
                visible: true,
                world_matrix: Mat4::IDENTITY,
                dirty: true,
                generation: 0,
                parent: None,
                first_child: None,
                next_sibling: None,
                mesh: None,
                alive: true,
            });
            (index, 0)
        }
    }

    pub fn is_valid(&self, id: NodeId) -> bool {
        let idx = id.index as usize;
        idx < self.nodes.len()
            && self.nodes[idx].alive
            && self.nodes[idx].generation == id.generation
    }

    fn mark_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(nid) = stack.pop() {
            let node = &mut self.nodes[nid.index as usize];
            if node.dirty {
                continue;
            }
            node.dirty = true;
            let mut child = node.first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes[c.index as usize].next_sibling;
            }
        }
    }

    fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        let old_first = self.nodes[parent.index as usize].first_child;
        self.nodes[child.index as usize].next_sibling = old_first;
        self.nodes[parent.index as usize].first_child = Some(child);
    }

    fn detach_child(&mut self, parent: NodeId, child: NodeId) {
        let first = self.nodes[parent.index as usize].first_child;
        if first == Some(child) {
            self.nodes[parent.index as usize].first_child =
                self.nodes[child.index as usize].next_sibling;
        } else {
            let mut prev = first;
            while let Some(p) = prev {
                let next = self.nodes[p.index as usize].next_sibling;
                if next == Some(child) {
                    self.nodes[p.index as usize].next_sibling =
                        self.nodes[child.index as usize].next_sibling;
                    break;
                }
                prev = next;
            }
        }
        self.nodes[child.index as usize].next_sibling = None;
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.nodes[c.index as usize].parent;
        }
        false
    }

    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(nid) = stack.pop() {
            out.push(nid);
            let mut child = self.nodes[nid.index as usize].first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes[c.index as usize].next_sibling;
            }
        }
        out
    }

    // ── Public scene graph API ───────────────────────────────────

    /// Create a grouping node (no mesh) with an optional parent.
    pub fn create_node(&mut self, local: Transform, parent: Option<NodeId>) -> NodeId {
        let (index, generation) = self.alloc_slot();
        self.nodes[index as usize].local = local;

        let id = NodeId { index, generation };

        if let Some(p) = parent
            && self.is_valid(p)
        {
            self.nodes[index as usize].parent = Some(p);
            self.attach_child(p, id);
        }

        id
    }

    /// Create a named grouping node.
    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        local: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.create_node(local, parent);
        self.nodes[id.index as usize].name = name.into();
        id
    }

    /// Create a node that draws a mesh.
    pub fn create_mesh(
        &mut self,
        name: impl Into<String>,
        mesh: MeshBinding,
        local: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.create_group(name, local, parent);
        self.nodes[id.index as usize].mesh = Some(mesh);
        self.renderables_dirty = true;
        id
    }

    /// Remove a node and all its descendants, disposing every geometry,
    /// material and texture map they reference.
    ///
    /// Returns None for a stale or unknown handle, so removing the same
    /// node twice never disposes anything twice.
    pub fn remove_node(&mut self, id: NodeId) -> Option<DisposeReport> {
        if !self.is_valid(id) {
            return None;
        }

        let to_remove = self.subtree(id);

        // Detach root of subtree from its parent
        if let Some(parent_id) = self.nodes[id.index as usize].parent {
            self.detach_child(parent_id, id);
        }

        let mut report = DisposeReport::default();
        for nid in &to_remove {
            let node = &mut self.nodes[nid.index as usize];
            node.alive = false;
            node.first_child = None;
            node.next_sibling = None;
            node.parent = None;
            let mesh = node.mesh.take();
            self.free_list.push(nid.index);
            report.nodes += 1;

            if let Some(mesh) = mesh {
                if self.resources.dispose_geometry(mesh.geometry) {
                    report.geometries += 1;
                }
                if let Some(textures) = self.resources.dispose_material(mesh.material) {
                    report.materials += 1;
                    report.textures += textures;
                }
            }
        }

        self.renderables_dirty = true;
        Some(report)
    }

    /// Set a node's local transform. Marks it and descendants dirty.
    pub fn set_local_transform(&mut self, id: NodeId, local: Transform) -> bool {
        if !self.is_valid(id) {
            return false;
        }
        self.nodes[id.index as usize].local = local;
        self.mark_dirty(id);
        true
    }

    /// Reparent a node. Pass None to make it a root node.
    pub fn set_parent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> bool {
        if !self.is_valid(id) {
            return false;
        }
        if let Some(p) = new_parent {
            if !self.is_valid(p) {
                return false;
            }
            if self.is_ancestor(id, p) {
                return false;
            }
        }

        // Detach from old parent
        if let Some(old_parent) = self.nodes[id.index as usize].parent {
            self.detach_child(old_parent, id);
        }

        // Attach to new parent
        self.nodes[id.index as usize].parent = new_parent;
        if let Some(p) = new_parent {
            self.attach_child(p, id);
        }

        self.mark_dirty(id);
        true
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        if !self.is_valid(id) {
            return false;
        }
        self.nodes[id.index as usize].visible = visible;
        true
    }

    /// Get the cached world matrix for a node.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        if !self.is_valid(id) {
            return None;
        }
        Some(self.nodes[id.index as usize].world_matrix)
    }

    /// World matrix computed from the current local transforms, without
    /// waiting for `update_world_transforms()`.
    pub fn compute_world_matrix(&self, id: NodeId) -> Option<Mat4> {
        if !self.is_valid(id) {
            return None;
        }

        let mut m = Mat4::IDENTITY;
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = &self.nodes[c.index as usize];
            m = node.local.to_matrix() * m;
            cur = node.parent;
        }
        Some(m)
    }

    /// Get a node's local transform.
    pub fn local_transform(&self, id: NodeId) -> Option<&Transform> {
        if !self.is_valid(id) {
            return None;
        }
        Some(&self.nodes[id.index as usize].local)
    }

    /// Get a node by id.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        if !self.is_valid(id) {
            return None;
        }
        Some(&self.nodes[id.index as usize])
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.is_valid(id) {
            return out;
        }
        let mut child = self.nodes[id.index as usize].first_child;
        while let Some(c) = child {
            out.push(c);
            child = self.nodes[c.index as usize].next_sibling;
        }
        out.reverse();
        out
    }

    /// Mesh bindings anywhere below (and including) `id`.
    pub fn subtree_meshes(&self, id: NodeId) -> Vec<(NodeId, MeshBinding)> {
        if !self.is_valid(id) {
            return Vec::new();
        }
        self.subtree(id)
            .into_iter()
            .filter_map(|nid| self.nodes[nid.index as usize].mesh.map(|m| (nid, m)))
            .collect()
    }

    /// World-space bounds of everything drawn in a subtree, computed from
    /// the current local transforms.
    pub fn subtree_bounds(&self, id: NodeId) -> Option<Aabb> {
        let mut bounds = Aabb::empty();
        for (nid, mesh) in self.subtree_meshes(id) {
            let Some(geometry) = self.resources.geometry(mesh.geometry) else {
                continue;
            };
            let Some(world) = self.compute_world_matrix(nid) else {
                continue;
            };
            bounds = bounds.union(&geometry.bounds().transformed(&world));
        }
        if bounds.is_empty() { None } else { Some(bounds) }
    }

    /// Closest mesh hit among the given subtrees, reported against the
    /// subtree root that owns it.
    pub fn raycast(&self, ray: &Ray, roots: &[NodeId]) -> Option<RayHit> {
        let mut closest: Option<RayHit> = None;
        for &root in roots {
            for (nid, mesh) in self.subtree_meshes(root) {
                if !self.nodes[nid.index as usize].visible {
                    continue;
                }
                let Some(geometry) = self.resources.geometry(mesh.geometry) else {
                    continue;
                };
                let Some(world) = self.compute_world_matrix(nid) else {
                    continue;
                };
                if let Some(t) = ray.intersect_aabb(&geometry.bounds(), &world)
                    && closest.is_none_or(|c| t < c.distance)
                {
                    closest = Some(RayHit {
                        root,
                        node: nid,
                        distance: t,
                        point: ray.at(t),
                    });
                }
            }
        }
        closest
    }

    /// Iterate renderable node ids (nodes with a mesh).
    pub fn renderables(&self) -> &[NodeId] {
        &self.renderables
    }

    /// Number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// Recompute world matrices for all dirty nodes. Call once per frame.
    pub fn update_world_transforms(&mut self) {
        // Rebuild renderables list if needed
        if self.renderables_dirty {
            self.renderables.clear();
            for (i, node) in self.nodes.iter().enumerate() {
                if node.alive && node.mesh.is_some() {
                    self.renderables.push(NodeId {
                        index: i as u32,
                        generation: node.generation,
                    });
                }
            }
            self.renderables_dirty = false;
        }

        // Process root nodes (no parent) and recurse into children
        for i in 0..self.nodes.len() {
            let node = &self.nodes[i];
            if !node.alive || !node.dirty || node.parent.is_some() {
                continue;
            }
            self.nodes[i].world_matrix = self.nodes[i].local.to_matrix();
            self.nodes[i].dirty = false;
            self.update_children(i);
        }

        // Second pass: catch any remaining dirty nodes (reparented mid-frame)
        for i in 0..self.nodes.len() {
            if self.nodes[i].alive && self.nodes[i].dirty {
                self.recompute_world_matrix(i);
            }
        }
    }

    fn update_children(&mut self, parent_idx: usize) {
        let parent_world = self.nodes[parent_idx].world_matrix;
        let mut child_id = self.nodes[parent_idx].first_child;
        while let Some(cid) = child_id {
            let ci = cid.index as usize;
            if self.nodes[ci].alive {
                let local = self.nodes[ci].local.to_matrix();
                self.nodes[ci].world_matrix = parent_world * local;
                self.nodes[ci].dirty = false;
                self.update_children(ci);
            }
            child_id = self.nodes[ci].next_sibling;
        }
    }

    fn recompute_world_matrix(&mut self, index: usize) {
        // Build chain from this node up to root
        let mut chain = Vec::with_capacity(8);
        let mut cur = index;
        loop {
            chain.push(cur);
            match self.nodes[cur].parent {
                Some(p) if self.nodes[p.index as usize].alive => {
                    cur = p.index as usize;
                }
                _ => break,
            }
        }

        // Walk from root down to target
        chain.reverse();
        let mut parent_world = Mat4::IDENTITY;
        for &idx in &chain {
            let node = &self.nodes[idx];
            if !node.dirty {
                parent_world = node.world_matrix;
                continue;
            }
            let world = parent_world * node.local.to_matrix();
            self.nodes[idx].world_matrix = world;
            self.nodes[idx].dirty = false;
            parent_world = world;
        }
    }

    /// Whether a node and all its ancestors are visible.
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(node) = self.get_node(c) else {
                return false;
            };
            if !node.visible {
                return false;
            }
            cur = node.parent;
        }
        true
    }
}
