//! Contracts the dispatcher needs from the rest of the editor.
//!
//! Camera animation, ray casting, brushes, mesh loading and widgets all live
//! behind these traits. The dispatcher owns one [`Collaborators`] bundle and
//! never reaches past it.

use crate::files::FileType;
use crate::math::{Aabb, Mat4, Vec3};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Identifier of a loaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub u32);

/// Result of a successful pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickHit {
    pub mesh: MeshId,
    /// Intersection point in the mesh's local space.
    pub point: Vec3,
}

/// Why the next frame is drawn. Passed to every render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RenderHint {
    #[default]
    None,
    Camera,
    Picking,
    Sculpt,
}

/// Cursor presentation over the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    /// Hidden while a brush stroke draws its own cursor.
    Hidden,
}

/// State handed to the sculpt collaborator on stroke start and update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeContext {
    /// Surface-space pointer position.
    pub position: Point,
    /// Mesh the stroke applies to.
    pub mesh: Option<MeshId>,
    pub hit: Option<PickHit>,
    /// Hit on the mirrored side when symmetry is enabled.
    pub mirror_hit: Option<PickHit>,
}

/// Name of the masking tool in the sculpt tool registry.
pub const MASKING_TOOL: &str = "MASKING";

pub trait Camera {
    /// Whether rotation and zoom orbit a picked pivot.
    fn uses_pivot(&self) -> bool;

    /// Current screen-space offset of the view.
    fn offset(&self) -> (f32, f32);

    /// Begin drag tracking.
    fn start(&mut self, position: Point, hit: Option<PickHit>);

    fn zoom(&mut self, delta: f64);

    fn translate(&mut self, dx: f64, dy: f64);

    /// Rotate toward the given pointer position.
    fn rotate(&mut self, position: Point);

    fn snap_closest_rotation(&mut self);

    fn set_pivot(&mut self, pivot: Vec3);

    /// Animate toward an offset and a distance from the pivot.
    fn move_animation_to(&mut self, offset_x: f32, offset_y: f32, distance: f32);
}

pub trait Picking {
    fn intersect_mesh(&mut self, mesh: MeshId, position: Point) -> Option<PickHit>;

    fn intersect_meshes(&mut self, meshes: &[MeshId], position: Point) -> Option<PickHit>;

    /// Result of the most recent intersection query.
    fn last_hit(&self) -> Option<PickHit>;

    fn mesh(&self) -> Option<MeshId> {
        self.last_hit().map(|hit| hit.mesh)
    }

    fn intersection_point(&self) -> Option<Vec3> {
        self.last_hit().map(|hit| hit.point)
    }
}

pub trait MaskTool {
    fn invert(&mut self, mesh: MeshId);
    fn clear(&mut self, mesh: MeshId);
}

pub trait Sculpt {
    /// Begin a stroke. `break_symmetry` is true while shift is held.
    fn start(&mut self, stroke: &StrokeContext, break_symmetry: bool);

    fn update(&mut self, stroke: &StrokeContext);

    /// End the stroke; a no-op when none is active.
    fn end(&mut self);

    /// Whether hover picking may run during a stroke.
    fn allow_picking(&self) -> bool;

    fn symmetry(&self) -> bool;

    /// Look up a tool by name.
    fn tool(&mut self, name: &str) -> Option<&mut dyn MaskTool>;
}

pub trait Scene {
    fn meshes(&self) -> &[MeshId];

    /// Mesh currently selected for editing.
    fn active_mesh(&self) -> Option<MeshId>;

    /// Placement (model matrix) of a mesh.
    fn placement(&self, mesh: MeshId) -> Mat4;

    /// Bounds enclosing every loaded mesh, `None` for an empty scene.
    fn bounds(&self) -> Option<Aabb>;

    fn has_dynamic_topology(&self, mesh: MeshId) -> bool;

    /// Load a mesh file routed by extension.
    fn load(&mut self, name: &str, data: &[u8], file_type: FileType) -> Result<(), String>;
}

pub trait Renderer {
    fn render(&mut self, hint: RenderHint);
}

pub trait Gui {
    fn set_cursor(&mut self, cursor: CursorStyle);

    /// Refresh vertex/face counts after topology changes.
    fn update_mesh_info(&mut self);

    /// Blocking user notification.
    fn notify(&mut self, message: &str);
}

/// Everything the dispatcher talks to.
pub struct Collaborators {
    pub camera: Box<dyn Camera>,
    pub picking: Box<dyn Picking>,
    /// Picker for the mirrored side of a symmetric stroke.
    pub picking_sym: Box<dyn Picking>,
    pub sculpt: Box<dyn Sculpt>,
    pub scene: Box<dyn Scene>,
    pub renderer: Box<dyn Renderer>,
    pub gui: Box<dyn Gui>,
}
