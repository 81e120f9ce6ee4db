//! Session wiring: live input subscription, file batches and replays.

use crate::collaborators::Collaborators;
use crate::config::InteractionConfig;
use crate::dispatch::Dispatcher;
use crate::files::{FileType, RoutedFile, replay_name, route_batch};
use crate::gesture::{GestureNormalizer, TouchPhase, TouchSample};
use crate::input::{DeviceEvent, Modifiers, MouseButton, wheel_direction};
use crate::replay::{Player, ReplayError, ReplayLog};
use kurbo::Point;
use thiserror::Error;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::ModifiersState;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("Failed to load {name}: {reason}")]
    Load { name: String, reason: String },
}

/// Owns the dispatcher and the touch gesture normalizer.
pub struct Session {
    dispatcher: Dispatcher,
    normalizer: GestureNormalizer,
    modifiers: Modifiers,
    cursor: Point,
    /// Release time and position of the last mouse click.
    last_click: Option<(Instant, Point)>,
}

impl Session {
    pub fn new(collab: Collaborators, config: InteractionConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(collab, config),
            normalizer: GestureNormalizer::new(config),
            modifiers: Modifiers::NONE,
            cursor: Point::ZERO,
            last_click: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn normalizer(&self) -> &GestureNormalizer {
        &self.normalizer
    }

    /// Start accepting live input. Input stops when the scope is dropped.
    pub fn attach(&mut self) -> InputScope<'_> {
        log::debug!("Live input attached");
        InputScope { session: self }
    }

    /// Play a log through the dispatcher.
    pub fn replay(&mut self, log: &ReplayLog) -> Result<usize, SessionError> {
        Ok(Player::play(&mut self.dispatcher, log)?)
    }

    /// Process a batch of dropped or opened files in order.
    ///
    /// Mesh files go to the scene. The first replay log is played and ends
    /// the batch. Returns the files that were processed.
    pub fn open_files(&mut self, files: &[(String, Vec<u8>)]) -> Result<Vec<RoutedFile>, SessionError> {
        let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
        let routed = route_batch(&names);

        for file in &routed {
            let (name, data) = &files[file.index];
            log::info!("Opening {} as {:?}", name, file.file_type);
            match file.file_type {
                FileType::Rep => {
                    let log = ReplayLog::from_bytes(data, replay_name(name))?;
                    self.replay(&log)?;
                }
                file_type => self
                    .dispatcher
                    .collaborators_mut()
                    .scene
                    .load(name, data, file_type)
                    .map_err(|reason| SessionError::Load {
                        name: name.clone(),
                        reason,
                    })?,
            }
        }
        Ok(routed)
    }

    fn is_double_click(&self, time: Instant, position: Point) -> bool {
        let limits = self.dispatcher.config().double_tap;
        self.last_click.is_some_and(|(last_time, last_position)| {
            time.duration_since(last_time) <= Duration::from_millis(limits.max_interval_ms)
                && last_position.distance(position) <= limits.position_threshold
        })
    }
}

/// Live input subscription on a [`Session`].
///
/// Dropping the scope detaches: touch tracking is reset and a gesture that is
/// still open is closed with an `Up`.
pub struct InputScope<'a> {
    session: &'a mut Session,
}

impl InputScope<'_> {
    pub fn session(&self) -> &Session {
        &*self.session
    }

    /// Feed a winit window event. Returns true when it was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(Point::new(position.x, position.y));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = MouseButton::from_winit(*button) else {
                    return false;
                };
                match state {
                    ElementState::Pressed => self.pointer_down(button),
                    ElementState::Released => self.pointer_up(Instant::now()),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => self.wheel(*delta, Instant::now()),
            WindowEvent::Touch(touch) => self.touch(TouchSample::from_winit(touch, Instant::now())),
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers_changed(modifiers.state()),
            WindowEvent::CursorEntered { .. } => self.session.dispatcher.pointer_entered(),
            WindowEvent::CursorLeft { .. } => self.pointer_left(),
            _ => return false,
        }
        true
    }

    pub fn modifiers_changed(&mut self, state: ModifiersState) {
        self.session.modifiers = state.into();
    }

    pub fn pointer_down(&mut self, button: MouseButton) {
        let session = &mut *self.session;
        session
            .dispatcher
            .dispatch(DeviceEvent::down(session.cursor, button, session.modifiers));
    }

    pub fn pointer_moved(&mut self, position: Point) {
        let session = &mut *self.session;
        session.cursor = position;
        session
            .dispatcher
            .dispatch(DeviceEvent::moved(position, session.modifiers));
    }

    /// Release at the last cursor position. A second quick release near the
    /// first also re-centers the camera.
    pub fn pointer_up(&mut self, now: Instant) {
        let session = &mut *self.session;
        let position = session.cursor;
        session.dispatcher.dispatch(DeviceEvent::up(position));

        if session.is_double_click(now, position) {
            session.last_click = None;
            session
                .dispatcher
                .dispatch(DeviceEvent::double_activate(position));
        } else {
            session.last_click = Some((now, position));
        }
    }

    /// Scroll input collapses to one wheel step per event.
    pub fn wheel(&mut self, delta: MouseScrollDelta, now: Instant) {
        if let Some(direction) = wheel_direction(delta) {
            self.session
                .dispatcher
                .dispatch_at(DeviceEvent::wheel(direction), now);
        }
    }

    pub fn touch(&mut self, sample: TouchSample) {
        let session = &mut *self.session;
        if sample.phase == TouchPhase::Started {
            session.dispatcher.set_overlay_focus(false);
        }
        for event in session.normalizer.process(sample) {
            session.dispatcher.dispatch_at(event, sample.time);
        }
    }

    pub fn pointer_entered(&mut self) {
        self.session.dispatcher.pointer_entered();
    }

    /// The pointer left the surface; any gesture ends at the last cursor position.
    pub fn pointer_left(&mut self) {
        let session = &mut *self.session;
        session.dispatcher.pointer_left(session.cursor);
    }

    pub fn set_overlay_focus(&mut self, focus: bool) {
        self.session.dispatcher.set_overlay_focus(focus);
    }

    pub fn surface_lost(&mut self) {
        self.session.dispatcher.surface_lost();
    }

    pub fn surface_restored(&mut self) {
        self.session.dispatcher.surface_restored();
    }

    /// Drive pending timers.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.session.dispatcher.tick(now)
    }
}

impl Drop for InputScope<'_> {
    fn drop(&mut self) {
        let session = &mut *self.session;
        if session.normalizer.is_gesture_open() || !session.dispatcher.mode().is_idle() {
            session.dispatcher.dispatch(DeviceEvent::up(session.cursor));
        }
        session.normalizer.reset();
        session.last_click = None;
        log::debug!("Live input detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MeshId;
    use crate::input::EventKind;
    use crate::math::{Aabb, Mat4, Vec3};
    use crate::mode::InteractionMode;
    use crate::trace::{self, Call, CallLog, MeshDescription, SceneDescription};
    use kurbo::Rect;

    fn scene() -> SceneDescription {
        SceneDescription {
            meshes: vec![MeshDescription {
                id: MeshId(1),
                region: Rect::new(0.0, 0.0, 50.0, 50.0),
                hit_point: Vec3::new(0.0, 0.0, 1.0),
                placement: Mat4::IDENTITY,
                bounds: Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0)),
                dynamic_topology: true,
            }],
            active: Some(MeshId(1)),
            sculpt_allows_picking: true,
            symmetry: true,
            ..Default::default()
        }
    }

    fn session(desc: &SceneDescription) -> (Session, CallLog) {
        let (collab, log) = trace::collaborators(desc);
        (Session::new(collab, InteractionConfig::default()), log)
    }

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    /// Drive a mixed live session and return the recorded log.
    fn live_session(session: &mut Session) -> ReplayLog {
        let t0 = Instant::now();
        session.dispatcher_mut().set_surface_origin(Point::new(8.0, 16.0));
        {
            let mut input = session.attach();
            input.modifiers_changed(ModifiersState::SHIFT);
            input.pointer_moved(Point::new(18.0, 26.0));
            input.pointer_down(MouseButton::Primary);
            input.pointer_moved(Point::new(24.0, 30.0));
            input.pointer_moved(Point::new(70.0, 30.0));
            input.pointer_up(t0);
            input.modifiers_changed(ModifiersState::ALT);
            input.pointer_moved(Point::new(108.0, 116.0));
            input.pointer_down(MouseButton::Primary);
            input.pointer_moved(Point::new(120.0, 100.0));
            input.pointer_up(ms(t0, 2000));
            input.modifiers_changed(ModifiersState::SHIFT);
            input.pointer_moved(Point::new(108.0, 166.0));
            input.pointer_down(MouseButton::Primary);
            input.pointer_moved(Point::new(118.0, 170.0));
            input.pointer_up(ms(t0, 2600));
            input.wheel(MouseScrollDelta::LineDelta(0.0, -3.0), ms(t0, 2100));
            input.touch(TouchSample::touch(1, TouchPhase::Started, Point::new(30.0, 30.0), ms(t0, 3000)));
            input.touch(TouchSample::touch(1, TouchPhase::Ended, Point::new(30.0, 30.0), ms(t0, 3050)));
            input.touch(TouchSample::touch(1, TouchPhase::Started, Point::new(32.0, 30.0), ms(t0, 3200)));
            input.touch(TouchSample::touch(1, TouchPhase::Ended, Point::new(32.0, 30.0), ms(t0, 3250)));
        }
        session.dispatcher_mut().recorder_mut().take_log()
    }

    #[test]
    fn test_replay_reproduces_live_calls() {
        let (mut live, live_calls) = session(&scene());
        let log = live_session(&mut live);
        assert!(!log.is_empty());

        let (mut replayed, replay_calls) = session(&scene());
        let count = replayed.replay(&log).unwrap();

        assert_eq!(count, log.len());
        assert_eq!(live_calls.calls(), replay_calls.calls());
        assert!(replay_calls.calls().contains(&Call::CameraSnapRotation));
        assert!(replayed.dispatcher().recorder().log().is_empty());
    }

    #[test]
    fn test_double_click_recenters() {
        let (mut session, log) = session(&scene());
        let t0 = Instant::now();
        {
            let mut input = session.attach();
            input.pointer_moved(Point::new(80.0, 80.0));
            input.pointer_down(MouseButton::Primary);
            input.pointer_up(t0);
            input.pointer_down(MouseButton::Primary);
            input.pointer_up(ms(t0, 200));
        }
        let calls = log.calls();
        assert!(calls.iter().any(|c| matches!(c, Call::CameraAnimate { .. })));
        let actions = &session.dispatcher().recorder().log().actions;
        assert!(actions.last().is_some_and(|a| a.matches(EventKind::DoubleActivate)));
    }

    #[test]
    fn test_slow_clicks_do_not_recenter() {
        let (mut session, log) = session(&scene());
        let t0 = Instant::now();
        {
            let mut input = session.attach();
            input.pointer_down(MouseButton::Primary);
            input.pointer_up(t0);
            input.pointer_down(MouseButton::Primary);
            input.pointer_up(ms(t0, 1000));
        }
        assert!(!log.calls().iter().any(|c| matches!(c, Call::CameraAnimate { .. })));
    }

    #[test]
    fn test_dropping_scope_closes_gesture() {
        let (mut session, log) = session(&scene());
        {
            let mut input = session.attach();
            let t0 = Instant::now();
            input.touch(TouchSample::touch(1, TouchPhase::Started, Point::new(80.0, 80.0), t0));
            input.touch(TouchSample::touch(1, TouchPhase::Moved, Point::new(90.0, 80.0), ms(t0, 16)));
            assert!(input.session().normalizer().is_gesture_open());
        }
        assert_eq!(session.dispatcher().mode(), InteractionMode::Idle);
        assert!(!session.normalizer().is_gesture_open());
        assert_eq!(log.calls().last(), Some(&Call::Render { hint: crate::collaborators::RenderHint::None }));
    }

    #[test]
    fn test_pointer_left_ends_gesture_at_cursor() {
        let (mut session, _log) = session(&scene());
        session.dispatcher_mut().set_surface_origin(Point::new(8.0, 16.0));
        {
            let mut input = session.attach();
            input.pointer_moved(Point::new(88.0, 96.0));
            input.pointer_down(MouseButton::Primary);
            input.pointer_moved(Point::new(98.0, 96.0));
            input.pointer_left();
        }
        let dispatcher = session.dispatcher();
        assert_eq!(dispatcher.mode(), InteractionMode::Idle);
        assert!(dispatcher.has_overlay_focus());
        let up = dispatcher.recorder().log().actions.last().unwrap().to_event(0).unwrap().unwrap();
        assert_eq!(up.kind, EventKind::Up);
        assert_eq!(up.position, Point::new(90.0, 80.0));
    }

    #[test]
    fn test_touch_start_releases_overlay_focus() {
        let (mut session, _log) = session(&scene());
        session.dispatcher_mut().set_overlay_focus(true);
        {
            let mut input = session.attach();
            let t0 = Instant::now();
            input.touch(TouchSample::touch(1, TouchPhase::Started, Point::new(80.0, 80.0), t0));
            input.touch(TouchSample::touch(1, TouchPhase::Moved, Point::new(95.0, 80.0), ms(t0, 16)));
            assert!(!input.session().dispatcher().has_overlay_focus());
            assert_eq!(input.session().dispatcher().mode(), InteractionMode::RotateCamera);
        }
    }

    #[test]
    fn test_open_files_routes_meshes_and_stops_at_replay() {
        let (mut session, log) = session(&scene());
        let mut replay = ReplayLog::new("ignored");
        replay.push(crate::replay::ReplayAction::device_wheel(1.0));
        let files = vec![
            ("head.OBJ".to_string(), b"v 0 0 0".to_vec()),
            ("notes.txt".to_string(), Vec::new()),
            ("demo.rep".to_string(), replay.to_json().unwrap().into_bytes()),
            ("late.stl".to_string(), Vec::new()),
        ];

        let routed = session.open_files(&files).unwrap();
        assert_eq!(routed.len(), 2);

        let calls = log.calls();
        assert_eq!(
            calls[0],
            Call::LoadScene {
                name: "head.OBJ".to_string(),
                file_type: FileType::Obj,
            }
        );
        assert!(calls.contains(&Call::CameraZoom { delta: 0.02 }));
        assert!(!calls.iter().any(|c| matches!(c, Call::LoadScene { name, .. } if name == "late.stl")));
    }

    #[test]
    fn test_open_files_bad_replay() {
        let (mut session, _log) = session(&scene());
        let files = vec![("broken.rep".to_string(), b"{".to_vec())];
        let err = session.open_files(&files).unwrap_err();
        assert!(matches!(err, SessionError::Replay(ReplayError::Parse(_))));
        assert!(!session.dispatcher().is_replaying());
    }
}
