//! Device event dispatch and the interaction mode state machine.

use crate::collaborators::{
    Collaborators, CursorStyle, MASKING_TOOL, MeshId, PickHit, RenderHint, StrokeContext,
};
use crate::config::InteractionConfig;
use crate::input::{DeviceEvent, EventKind, MouseButton};
use crate::math::Vec3;
use crate::mode::{InteractionMode, resolve_mode};
use crate::replay::{ReplayAction, Recorder};
use crate::timer::DebounceTimer;
use kurbo::{Point, Vec2};

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Routes canonical device events to the camera, picking and sculpt
/// collaborators according to the current [`InteractionMode`].
///
/// Every event goes through the same entry points whether it comes from live
/// input or from a replay log, which is what makes playback deterministic.
pub struct Dispatcher {
    collab: Collaborators,
    config: InteractionConfig,
    recorder: Recorder,
    mode: InteractionMode,
    button: Option<MouseButton>,
    /// Surface-relative position of the latest sampled event.
    position: Point,
    last_position: Point,
    mask_anchor: Option<Point>,
    /// Mesh picked when the current stroke began.
    stroke_mesh: Option<MeshId>,
    overlay_focus: bool,
    surface_origin: Vec2,
    wheel_end: DebounceTimer,
}

impl Dispatcher {
    pub fn new(collab: Collaborators, config: InteractionConfig) -> Self {
        Self {
            collab,
            config,
            recorder: Recorder::new("session"),
            mode: InteractionMode::Idle,
            button: None,
            position: Point::ZERO,
            last_position: Point::ZERO,
            mask_anchor: None,
            stroke_mesh: None,
            overlay_focus: false,
            surface_origin: Vec2::ZERO,
            wheel_end: DebounceTimer::new(Duration::from_millis(config.wheel_end_ms)),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collab
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn button(&self) -> Option<MouseButton> {
        self.button
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn mask_anchor(&self) -> Option<Point> {
        self.mask_anchor
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    pub fn is_replaying(&self) -> bool {
        self.recorder.is_playing()
    }

    pub(crate) fn begin_replay(&mut self) {
        self.recorder.set_playing(true);
    }

    pub(crate) fn end_replay(&mut self) {
        self.recorder.set_playing(false);
    }

    /// Top-left corner of the rendering surface in window coordinates.
    pub fn set_surface_origin(&mut self, origin: Point) {
        self.surface_origin = origin.to_vec2();
    }

    pub fn has_overlay_focus(&self) -> bool {
        self.overlay_focus
    }

    /// While an overlay widget holds focus, live pointer input is swallowed.
    pub fn set_overlay_focus(&mut self, focus: bool) {
        self.overlay_focus = focus;
    }

    pub fn pointer_entered(&mut self) {
        self.overlay_focus = false;
    }

    /// The pointer left the surface at `position`: claim focus and finish
    /// any gesture there.
    pub fn pointer_left(&mut self, position: Point) {
        self.overlay_focus = true;
        self.on_up(&DeviceEvent::up(position));
    }

    pub fn surface_lost(&mut self) {
        log::warn!("Rendering surface lost");
        self.collab.gui.notify("Rendering context lost. Waiting for it to be restored.");
    }

    pub fn surface_restored(&mut self) {
        log::info!("Rendering surface restored");
        self.collab.gui.notify("Rendering context restored.");
    }

    /// When the pending wheel-end render is due, if any.
    pub fn wheel_end_deadline(&self) -> Option<Instant> {
        self.wheel_end.deadline()
    }

    pub fn dispatch(&mut self, event: DeviceEvent) {
        self.dispatch_at(event, Instant::now());
    }

    /// Dispatch with an explicit clock reading for the wheel debounce.
    pub fn dispatch_at(&mut self, event: DeviceEvent, now: Instant) {
        match event.kind {
            EventKind::Down => self.on_down(&event),
            EventKind::Move => self.on_move(&event),
            EventKind::Up => self.on_up(&event),
            EventKind::Wheel(delta) => self.on_wheel(delta, now),
            EventKind::DoubleActivate => self.on_double_activate(&event),
        }
    }

    /// Fire the wheel-end render if its deadline has passed. Returns true
    /// when it fired.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.wheel_end.poll(now) {
            return false;
        }
        log::trace!("Wheel burst ended");
        self.collab.renderer.render(RenderHint::None);
        true
    }

    /// Surface-relative position of a live event, `None` when swallowed by
    /// overlay focus. Replayed positions are already surface-relative.
    fn sample_position(&self, event: &DeviceEvent) -> Option<Point> {
        if self.overlay_focus && !self.is_replaying() {
            None
        } else {
            Some(self.surface_position(event))
        }
    }

    fn surface_position(&self, event: &DeviceEvent) -> Point {
        if self.is_replaying() {
            event.position
        } else {
            event.position - self.surface_origin
        }
    }

    fn on_down(&mut self, event: &DeviceEvent) {
        let Some(position) = self.sample_position(event) else {
            log::debug!("Down swallowed by overlay focus");
            return;
        };
        if !self.mode.is_idle() {
            log::debug!("Down ignored while {:?} is active", self.mode);
            return;
        }

        let button = event.button.unwrap_or(MouseButton::Primary);
        self.position = position;
        self.button = Some(button);

        let c = &mut self.collab;
        let hit = c.picking.intersect_meshes(c.scene.meshes(), position);
        let mode = resolve_mode(button, event.modifiers, hit.is_some());

        if mode == InteractionMode::MaskEdit {
            self.mask_anchor = Some(position);
        }

        if mode.tracks_camera() {
            if c.camera.uses_pivot() {
                c.picking.intersect_meshes(c.scene.meshes(), position);
            }
            c.camera.start(position, c.picking.last_hit());
        }

        if mode == InteractionMode::Sculpt {
            self.stroke_mesh = hit.map(|h| h.mesh);
            c.gui.set_cursor(CursorStyle::Hidden);
            let mirror_hit = mirror_pick(c, self.stroke_mesh, position);
            let stroke = StrokeContext {
                position,
                mesh: self.stroke_mesh,
                hit,
                mirror_hit,
            };
            c.sculpt.start(&stroke, event.modifiers.shift);
        }

        log::debug!("{:?} down at {:?}: {:?}", button, position, mode);
        self.mode = mode;
        self.last_position = position;
        self.recorder
            .record(ReplayAction::device_down(button, position, event.modifiers));
    }

    fn on_move(&mut self, event: &DeviceEvent) {
        let Some(position) = self.sample_position(event) else {
            return;
        };
        self.position = position;

        let c = &mut self.collab;
        let sculpting = self.mode == InteractionMode::Sculpt;
        let target = self.stroke_mesh.or_else(|| c.scene.active_mesh());

        let mut picked = false;
        let mut hit = None;
        let mut mirror_hit = None;
        if !sculpting || c.sculpt.allow_picking() {
            picked = true;
            hit = match (sculpting, target) {
                (true, Some(mesh)) => c.picking.intersect_mesh(mesh, position),
                _ => c.picking.intersect_meshes(c.scene.meshes(), position),
            };
            mirror_hit = mirror_pick(c, target, position);
        }

        let dx = position.x - self.last_position.x;
        let dy = position.y - self.last_position.y;
        let divisor = self.config.drag_divisor;
        let modifiers = event.modifiers;

        let hint = match self.mode {
            InteractionMode::ZoomDrag => {
                c.camera.zoom((dx + dy) / divisor);
                Some(RenderHint::Camera)
            }
            InteractionMode::PanDrag if !modifiers.alt => {
                c.camera.zoom((dx + dy) / divisor);
                Some(RenderHint::Camera)
            }
            InteractionMode::PanDrag | InteractionMode::PanWheel => {
                c.camera.translate(dx / divisor, dy / divisor);
                Some(RenderHint::Camera)
            }
            InteractionMode::RotateCamera => {
                if modifiers.shift {
                    c.camera.snap_closest_rotation();
                } else {
                    c.camera.rotate(position);
                }
                Some(RenderHint::Camera)
            }
            InteractionMode::Sculpt => {
                if !picked {
                    hit = c.picking.last_hit();
                    mirror_hit = if c.sculpt.symmetry() {
                        c.picking_sym.last_hit()
                    } else {
                        None
                    };
                }
                let stroke = StrokeContext {
                    position,
                    mesh: target,
                    hit,
                    mirror_hit,
                };
                c.sculpt.update(&stroke);
                if target.is_some_and(|mesh| c.scene.has_dynamic_topology(mesh)) {
                    c.gui.update_mesh_info();
                }
                Some(RenderHint::Sculpt)
            }
            InteractionMode::Idle | InteractionMode::MaskEdit => None,
        };

        match hint {
            Some(hint) => c.renderer.render(hint),
            None if picked => c.renderer.render(RenderHint::Picking),
            None => {}
        }

        self.last_position = position;
        self.recorder
            .record(ReplayAction::device_move(position, modifiers));
    }

    /// Up is never swallowed, so a gesture always closes.
    fn on_up(&mut self, event: &DeviceEvent) {
        let position = self.surface_position(event);
        self.position = position;

        let c = &mut self.collab;
        c.gui.set_cursor(CursorStyle::Default);
        self.button = None;
        c.sculpt.end();

        if self.mode == InteractionMode::MaskEdit {
            match (self.mask_anchor, c.scene.active_mesh()) {
                (Some(anchor), Some(mesh)) => match c.sculpt.tool(MASKING_TOOL) {
                    Some(mask) if position == anchor => mask.invert(mesh),
                    Some(mask) => mask.clear(mesh),
                    None => log::warn!("No masking tool registered"),
                },
                _ => log::debug!("Mask edit finished without an active mesh"),
            }
        }

        if !self.mode.is_idle() {
            log::debug!("{:?} finished", self.mode);
        }
        self.mode = InteractionMode::Idle;
        self.mask_anchor = None;
        self.stroke_mesh = None;
        c.renderer.render(RenderHint::None);
        self.recorder.record(ReplayAction::device_up(position));
    }

    fn on_wheel(&mut self, delta: f32, now: Instant) {
        self.recorder.record(ReplayAction::device_wheel(delta));
        let c = &mut self.collab;
        c.camera.zoom(delta as f64 * self.config.wheel_zoom_step);
        c.renderer.render(RenderHint::Camera);
        self.wheel_end.arm(now);
    }

    fn on_double_activate(&mut self, event: &DeviceEvent) {
        let Some(position) = self.sample_position(event) else {
            log::debug!("Double activate swallowed by overlay focus");
            return;
        };
        self.position = position;
        self.recorder.record(ReplayAction::double_tap(position));

        let config = &self.config;
        let c = &mut self.collab;
        let (pivot, distance) = match c.picking.intersect_meshes(c.scene.meshes(), position) {
            Some(PickHit { mesh, point }) => {
                (c.scene.placement(mesh).transform_point(point), config.pick_distance)
            }
            None if c.scene.meshes().is_empty() => (Vec3::ZERO, config.empty_scene_distance),
            None => {
                let distance = c
                    .scene
                    .bounds()
                    .map(|bounds| config.bounds_distance_factor * bounds.diagonal())
                    .unwrap_or(config.empty_scene_distance);
                (Vec3::ZERO, distance)
            }
        };

        log::debug!("Re-centering on {:?} at distance {}", pivot, distance);
        c.camera.set_pivot(pivot);
        let (offset_x, offset_y) = c.camera.offset();
        c.camera.move_animation_to(offset_x, offset_y, distance);
        c.renderer.render(RenderHint::Camera);
    }
}

/// Pick the mirrored side of `mesh` when symmetry is enabled.
fn mirror_pick(c: &mut Collaborators, mesh: Option<MeshId>, position: Point) -> Option<PickHit> {
    match mesh {
        Some(mesh) if c.sculpt.symmetry() => c.picking_sym.intersect_mesh(mesh, position),
        _ => None,
    }
}
