//! Collaborators that record every call instead of doing real work.
//!
//! Used for headless replays and to compare a live session against its
//! replay call for call. Picking is scripted: each mesh owns a screen-space
//! region, and a pick inside it reports a fixed local-space point.

use crate::collaborators::{
    Camera, Collaborators, CursorStyle, Gui, MASKING_TOOL, MaskTool, MeshId, PickHit, Picking,
    RenderHint, Renderer, Scene, Sculpt, StrokeContext,
};
use crate::files::FileType;
use crate::math::{Aabb, Mat4, Vec3};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// One collaborator call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    CameraStart { position: Point, hit: Option<PickHit> },
    CameraZoom { delta: f64 },
    CameraTranslate { dx: f64, dy: f64 },
    CameraRotate { position: Point },
    CameraSnapRotation,
    CameraSetPivot { pivot: Vec3 },
    CameraAnimate { offset_x: f32, offset_y: f32, distance: f32 },
    PickMesh { mesh: MeshId, position: Point, hit: bool },
    PickMeshes { position: Point, hit: Option<MeshId> },
    PickMirror { mesh: MeshId, position: Point, hit: bool },
    SculptStart { stroke: StrokeContext, break_symmetry: bool },
    SculptUpdate { stroke: StrokeContext },
    SculptEnd,
    MaskInvert { mesh: MeshId },
    MaskClear { mesh: MeshId },
    Render { hint: RenderHint },
    Cursor { cursor: CursorStyle },
    MeshInfo,
    Notify { message: String },
    LoadScene { name: String, file_type: FileType },
}

/// Shared, append-only list of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Remove and return all calls.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// A mesh in a scripted scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDescription {
    pub id: MeshId,
    /// Surface region where picking hits this mesh.
    pub region: Rect,
    /// Local-space point reported for hits.
    pub hit_point: Vec3,
    #[serde(default)]
    pub placement: Mat4,
    pub bounds: Aabb,
    #[serde(default)]
    pub dynamic_topology: bool,
}

/// A scripted scene and collaborator settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub meshes: Vec<MeshDescription>,
    pub active: Option<MeshId>,
    pub camera_uses_pivot: bool,
    pub sculpt_allows_picking: bool,
    pub symmetry: bool,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Build tracing collaborators for a scene. All of them share the returned log.
pub fn collaborators(scene: &SceneDescription) -> (Collaborators, CallLog) {
    let log = CallLog::new();
    let collab = Collaborators {
        camera: Box::new(TraceCamera {
            log: log.clone(),
            uses_pivot: scene.camera_uses_pivot,
            offset: (0.0, 0.0),
        }),
        picking: Box::new(TracePicking::new(log.clone(), scene.meshes.clone(), false)),
        picking_sym: Box::new(TracePicking::new(log.clone(), scene.meshes.clone(), true)),
        sculpt: Box::new(TraceSculpt {
            log: log.clone(),
            allow_picking: scene.sculpt_allows_picking,
            symmetry: scene.symmetry,
            mask: TraceMask { log: log.clone() },
        }),
        scene: Box::new(TraceScene {
            log: log.clone(),
            ids: scene.meshes.iter().map(|m| m.id).collect(),
            meshes: scene.meshes.clone(),
            active: scene.active,
        }),
        renderer: Box::new(TraceRenderer { log: log.clone() }),
        gui: Box::new(TraceGui { log: log.clone() }),
    };
    (collab, log)
}

pub struct TraceCamera {
    log: CallLog,
    uses_pivot: bool,
    offset: (f32, f32),
}

impl Camera for TraceCamera {
    fn uses_pivot(&self) -> bool {
        self.uses_pivot
    }

    fn offset(&self) -> (f32, f32) {
        self.offset
    }

    fn start(&mut self, position: Point, hit: Option<PickHit>) {
        self.log.push(Call::CameraStart { position, hit });
    }

    fn zoom(&mut self, delta: f64) {
        self.log.push(Call::CameraZoom { delta });
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.offset.0 += dx as f32;
        self.offset.1 += dy as f32;
        self.log.push(Call::CameraTranslate { dx, dy });
    }

    fn rotate(&mut self, position: Point) {
        self.log.push(Call::CameraRotate { position });
    }

    fn snap_closest_rotation(&mut self) {
        self.log.push(Call::CameraSnapRotation);
    }

    fn set_pivot(&mut self, pivot: Vec3) {
        self.log.push(Call::CameraSetPivot { pivot });
    }

    fn move_animation_to(&mut self, offset_x: f32, offset_y: f32, distance: f32) {
        self.log.push(Call::CameraAnimate {
            offset_x,
            offset_y,
            distance,
        });
    }
}

pub struct TracePicking {
    log: CallLog,
    meshes: Vec<MeshDescription>,
    last: Option<PickHit>,
    mirror: bool,
}

impl TracePicking {
    fn new(log: CallLog, meshes: Vec<MeshDescription>, mirror: bool) -> Self {
        Self {
            log,
            meshes,
            last: None,
            mirror,
        }
    }

    fn hit(&self, mesh: MeshId, position: Point) -> Option<PickHit> {
        self.meshes
            .iter()
            .find(|m| m.id == mesh && m.region.contains(position))
            .map(|m| PickHit {
                mesh: m.id,
                point: m.hit_point,
            })
    }
}

impl Picking for TracePicking {
    fn intersect_mesh(&mut self, mesh: MeshId, position: Point) -> Option<PickHit> {
        self.last = self.hit(mesh, position);
        let hit = self.last.is_some();
        self.log.push(if self.mirror {
            Call::PickMirror { mesh, position, hit }
        } else {
            Call::PickMesh { mesh, position, hit }
        });
        self.last
    }

    fn intersect_meshes(&mut self, meshes: &[MeshId], position: Point) -> Option<PickHit> {
        self.last = meshes.iter().find_map(|&mesh| self.hit(mesh, position));
        self.log.push(Call::PickMeshes {
            position,
            hit: self.last.map(|h| h.mesh),
        });
        self.last
    }

    fn last_hit(&self) -> Option<PickHit> {
        self.last
    }
}

pub struct TraceMask {
    log: CallLog,
}

impl MaskTool for TraceMask {
    fn invert(&mut self, mesh: MeshId) {
        self.log.push(Call::MaskInvert { mesh });
    }

    fn clear(&mut self, mesh: MeshId) {
        self.log.push(Call::MaskClear { mesh });
    }
}

pub struct TraceSculpt {
    log: CallLog,
    allow_picking: bool,
    symmetry: bool,
    mask: TraceMask,
}

impl Sculpt for TraceSculpt {
    fn start(&mut self, stroke: &StrokeContext, break_symmetry: bool) {
        self.log.push(Call::SculptStart {
            stroke: *stroke,
            break_symmetry,
        });
    }

    fn update(&mut self, stroke: &StrokeContext) {
        self.log.push(Call::SculptUpdate { stroke: *stroke });
    }

    fn end(&mut self) {
        self.log.push(Call::SculptEnd);
    }

    fn allow_picking(&self) -> bool {
        self.allow_picking
    }

    fn symmetry(&self) -> bool {
        self.symmetry
    }

    fn tool(&mut self, name: &str) -> Option<&mut dyn MaskTool> {
        (name == MASKING_TOOL).then_some(&mut self.mask as &mut dyn MaskTool)
    }
}

pub struct TraceScene {
    log: CallLog,
    ids: Vec<MeshId>,
    meshes: Vec<MeshDescription>,
    active: Option<MeshId>,
}

impl TraceScene {
    fn describe(&self, mesh: MeshId) -> Option<&MeshDescription> {
        self.meshes.iter().find(|m| m.id == mesh)
    }
}

impl Scene for TraceScene {
    fn meshes(&self) -> &[MeshId] {
        &self.ids
    }

    fn active_mesh(&self) -> Option<MeshId> {
        self.active
    }

    fn placement(&self, mesh: MeshId) -> Mat4 {
        self.describe(mesh).map(|m| m.placement).unwrap_or_default()
    }

    fn bounds(&self) -> Option<Aabb> {
        self.meshes
            .iter()
            .map(|m| m.bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    fn has_dynamic_topology(&self, mesh: MeshId) -> bool {
        self.describe(mesh).is_some_and(|m| m.dynamic_topology)
    }

    fn load(&mut self, name: &str, _data: &[u8], file_type: FileType) -> Result<(), String> {
        self.log.push(Call::LoadScene {
            name: name.to_string(),
            file_type,
        });
        Ok(())
    }
}

pub struct TraceRenderer {
    log: CallLog,
}

impl Renderer for TraceRenderer {
    fn render(&mut self, hint: RenderHint) {
        self.log.push(Call::Render { hint });
    }
}

pub struct TraceGui {
    log: CallLog,
}

impl Gui for TraceGui {
    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.log.push(Call::Cursor { cursor });
    }

    fn update_mesh_info(&mut self) {
        self.log.push(Call::MeshInfo);
    }

    fn notify(&mut self, message: &str) {
        self.log.push(Call::Notify {
            message: message.to_string(),
        });
    }
}
