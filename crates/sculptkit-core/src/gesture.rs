//! Multi-touch gesture normalization.
//!
//! Raw touch samples go in; canonical [`DeviceEvent`]s come out. One touch
//! gesture becomes `Down, Move*, Up`, a change in finger count re-opens the
//! gesture, a double tap becomes `DoubleActivate`, and pinching becomes wheel
//! steps.

use crate::config::InteractionConfig;
use crate::input::{DeviceEvent, Modifiers, MouseButton};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Device a pointer sample originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerType {
    Touch,
    Pen,
    /// Mouse samples are delivered to the dispatcher directly and ignored here.
    Mouse,
}

/// Lifecycle phase of one pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

impl From<winit::event::TouchPhase> for TouchPhase {
    fn from(phase: winit::event::TouchPhase) -> Self {
        match phase {
            winit::event::TouchPhase::Started => TouchPhase::Started,
            winit::event::TouchPhase::Moved => TouchPhase::Moved,
            winit::event::TouchPhase::Ended => TouchPhase::Ended,
            winit::event::TouchPhase::Cancelled => TouchPhase::Cancelled,
        }
    }
}

/// One raw pointer sample.
#[derive(Debug, Clone, Copy)]
pub struct TouchSample {
    pub id: u64,
    pub phase: TouchPhase,
    pub position: Point,
    pub pointer_type: PointerType,
    pub time: Instant,
}

impl TouchSample {
    pub fn touch(id: u64, phase: TouchPhase, position: Point, time: Instant) -> Self {
        Self {
            id,
            phase,
            position,
            pointer_type: PointerType::Touch,
            time,
        }
    }

    /// Convert a winit touch, stamped with the time it was received.
    pub fn from_winit(touch: &winit::event::Touch, time: Instant) -> Self {
        Self::touch(
            touch.id,
            touch.phase.into(),
            Point::new(touch.location.x, touch.location.y),
            time,
        )
    }
}

/// Tracking state kept between samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureTrackState {
    /// Pointer count reported with the last `Down`.
    pub last_pointer_count: u8,
    /// Pinch scale at the last emitted wheel step.
    pub last_scale: f64,
    /// Release time and position of the last completed single tap.
    pub last_tap: Option<(Instant, Point)>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveGesture {
    start_time: Instant,
    start_position: Point,
    /// Farthest the centroid travelled from the start.
    travel: f64,
    peak_pointers: usize,
    /// False while a possible second tap holds its `Down` back.
    down_sent: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct PinchTrack {
    reference_distance: Option<f64>,
    active: bool,
}

/// Turns raw touch samples into canonical device events.
#[derive(Debug, Clone)]
pub struct GestureNormalizer {
    config: InteractionConfig,
    pointers: BTreeMap<u64, Point>,
    state: GestureTrackState,
    gesture: Option<ActiveGesture>,
    pinch: PinchTrack,
}

impl GestureNormalizer {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            pointers: BTreeMap::new(),
            state: GestureTrackState::default(),
            gesture: None,
            pinch: PinchTrack::default(),
        }
    }

    pub fn state(&self) -> &GestureTrackState {
        &self.state
    }

    /// Whether a `Down` has been emitted and not yet closed.
    pub fn is_gesture_open(&self) -> bool {
        self.gesture.is_some_and(|g| g.down_sent)
    }

    /// Drop all tracking state.
    pub fn reset(&mut self) {
        self.pointers.clear();
        self.state = GestureTrackState::default();
        self.gesture = None;
        self.pinch = PinchTrack::default();
    }

    /// Process one raw sample.
    pub fn process(&mut self, sample: TouchSample) -> Vec<DeviceEvent> {
        let mut out = Vec::new();
        if sample.pointer_type == PointerType::Mouse {
            return out;
        }

        match sample.phase {
            TouchPhase::Started => {
                self.pointers.insert(sample.id, sample.position);
                if self.gesture.is_none() {
                    self.begin_gesture(sample.time, &mut out);
                } else {
                    self.track(sample.time, &mut out);
                }
            }
            TouchPhase::Moved => {
                let Some(position) = self.pointers.get_mut(&sample.id) else {
                    return out;
                };
                *position = sample.position;
                self.track(sample.time, &mut out);
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                if self.pointers.remove(&sample.id).is_none() {
                    return out;
                }
                if self.pointers.is_empty() {
                    let cancelled = sample.phase == TouchPhase::Cancelled;
                    self.end_gesture(sample.time, sample.position, cancelled, &mut out);
                } else {
                    self.track(sample.time, &mut out);
                }
            }
        }
        out
    }

    /// Record the scale at which a pinch starts.
    pub fn pinch_start(&mut self, scale: f64) {
        self.state.last_scale = scale;
    }

    /// Wheel step for a new pinch scale.
    ///
    /// The delta is narrowed to `f32` so replays compare bit-for-bit on every
    /// platform.
    pub fn pinch_update(&mut self, scale: f64) -> DeviceEvent {
        let delta = ((scale - self.state.last_scale) * self.config.pinch_wheel_scale) as f32;
        self.state.last_scale = scale;
        DeviceEvent::wheel(delta)
    }

    fn pointer_count(&self) -> u8 {
        let cap = self.config.max_pointers.max(1) as usize;
        self.pointers.len().min(cap) as u8
    }

    fn centroid(&self) -> Point {
        let n = self.pointers.len().max(1) as f64;
        let (sx, sy) = self
            .pointers
            .values()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / n, sy / n)
    }

    fn down_event(position: Point, count: u8) -> DeviceEvent {
        DeviceEvent::down(position, MouseButton::from_pointer_count(count), Modifiers::NONE)
            .with_pointer_count(count)
    }

    fn is_second_tap(&self, time: Instant, position: Point) -> bool {
        let tap = &self.config.double_tap;
        self.state.last_tap.is_some_and(|(released, at)| {
            time.duration_since(released) <= Duration::from_millis(tap.max_interval_ms)
                && at.distance(position) <= tap.position_threshold
        })
    }

    fn begin_gesture(&mut self, time: Instant, out: &mut Vec<DeviceEvent>) {
        let position = self.centroid();
        let count = self.pointer_count();
        let deferred = self.is_second_tap(time, position);

        self.gesture = Some(ActiveGesture {
            start_time: time,
            start_position: position,
            travel: 0.0,
            peak_pointers: self.pointers.len(),
            down_sent: !deferred,
        });
        self.state.last_pointer_count = count;
        if deferred {
            log::debug!("Holding touch down back as a possible double tap");
        } else {
            out.push(Self::down_event(position, count));
        }
    }

    fn track(&mut self, time: Instant, out: &mut Vec<DeviceEvent>) {
        let position = self.centroid();
        let count = self.pointer_count();
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        gesture.travel = gesture.travel.max(gesture.start_position.distance(position));
        gesture.peak_pointers = gesture.peak_pointers.max(self.pointers.len());

        if !gesture.down_sent {
            let tap = &self.config.double_tap;
            let held = time.duration_since(gesture.start_time) > Duration::from_millis(tap.max_press_ms);
            if gesture.travel <= tap.move_threshold && !held && gesture.peak_pointers == 1 {
                return;
            }
            // Not a tap after all
            gesture.down_sent = true;
            self.state.last_tap = None;
            out.push(Self::down_event(gesture.start_position, self.state.last_pointer_count));
        }

        if count != self.state.last_pointer_count {
            out.push(DeviceEvent::up(position));
            out.push(Self::down_event(position, count));
            self.state.last_pointer_count = count;
        }
        out.push(DeviceEvent::moved(position, Modifiers::NONE).with_pointer_count(count));

        self.track_pinch(out);
    }

    fn track_pinch(&mut self, out: &mut Vec<DeviceEvent>) {
        let mut points = self.pointers.values();
        let (Some(a), Some(b)) = (points.next(), points.next()) else {
            self.pinch = PinchTrack::default();
            return;
        };
        let distance = a.distance(*b);
        let Some(reference) = self.pinch.reference_distance else {
            self.pinch.reference_distance = Some(distance);
            return;
        };
        if reference <= 0.0 {
            return;
        }
        let scale = distance / reference;
        if self.pinch.active {
            out.push(self.pinch_update(scale));
        } else if (scale - 1.0).abs() >= self.config.pinch_threshold {
            self.pinch.active = true;
            self.pinch_start(scale);
        }
    }

    fn end_gesture(&mut self, time: Instant, position: Point, cancelled: bool, out: &mut Vec<DeviceEvent>) {
        self.pinch = PinchTrack::default();
        let Some(gesture) = self.gesture.take() else {
            return;
        };

        let tap = &self.config.double_tap;
        let is_tap = !cancelled
            && gesture.peak_pointers == 1
            && gesture.travel <= tap.move_threshold
            && time.duration_since(gesture.start_time) <= Duration::from_millis(tap.max_press_ms);

        if !gesture.down_sent {
            self.state.last_tap = None;
            if is_tap {
                out.push(DeviceEvent::double_activate(gesture.start_position));
            } else if !cancelled {
                out.push(Self::down_event(gesture.start_position, self.state.last_pointer_count));
                out.push(DeviceEvent::up(position));
            }
            return;
        }

        out.push(DeviceEvent::up(position));
        self.state.last_tap = is_tap.then_some((time, position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::EventKind;

    fn kinds(events: &[DeviceEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_single_finger_drag() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());

        let down = n.process(TouchSample::touch(1, TouchPhase::Started, Point::new(10.0, 10.0), t));
        assert_eq!(kinds(&down), vec![EventKind::Down]);
        assert_eq!(down[0].pointer_count, 1);
        assert_eq!(down[0].button, Some(MouseButton::Primary));

        let moved = n.process(TouchSample::touch(1, TouchPhase::Moved, Point::new(40.0, 10.0), ms(t, 20)));
        assert_eq!(kinds(&moved), vec![EventKind::Move]);
        assert_eq!(moved[0].position, Point::new(40.0, 10.0));

        let up = n.process(TouchSample::touch(1, TouchPhase::Ended, Point::new(40.0, 10.0), ms(t, 400)));
        assert_eq!(kinds(&up), vec![EventKind::Up]);
        assert!(!n.is_gesture_open());
    }

    #[test]
    fn test_second_finger_reopens_gesture() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        n.process(TouchSample::touch(1, TouchPhase::Started, Point::new(0.0, 0.0), t));
        n.process(TouchSample::touch(1, TouchPhase::Moved, Point::new(20.0, 0.0), ms(t, 10)));

        let events = n.process(TouchSample::touch(2, TouchPhase::Started, Point::new(20.0, 40.0), ms(t, 20)));
        assert_eq!(kinds(&events), vec![EventKind::Up, EventKind::Down, EventKind::Move]);
        assert_eq!(events[1].pointer_count, 2);
        assert_eq!(events[1].button, Some(MouseButton::Middle));
        assert_eq!(events[2].position, Point::new(20.0, 20.0));
    }

    #[test]
    fn test_lifting_a_finger_reopens_with_one() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        n.process(TouchSample::touch(1, TouchPhase::Started, Point::new(0.0, 0.0), t));
        n.process(TouchSample::touch(2, TouchPhase::Started, Point::new(10.0, 0.0), ms(t, 5)));

        let events = n.process(TouchSample::touch(2, TouchPhase::Ended, Point::new(10.0, 0.0), ms(t, 50)));
        assert_eq!(kinds(&events), vec![EventKind::Up, EventKind::Down, EventKind::Move]);
        assert_eq!(events[1].pointer_count, 1);
    }

    #[test]
    fn test_pointer_count_capped() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        n.process(TouchSample::touch(1, TouchPhase::Started, Point::new(0.0, 0.0), t));
        n.process(TouchSample::touch(2, TouchPhase::Started, Point::new(10.0, 0.0), ms(t, 5)));

        let events = n.process(TouchSample::touch(3, TouchPhase::Started, Point::new(20.0, 0.0), ms(t, 10)));
        assert_eq!(kinds(&events), vec![EventKind::Move]);
        assert_eq!(events[0].pointer_count, 2);
    }

    #[test]
    fn test_never_two_downs_in_a_row() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        let mut all = Vec::new();
        all.extend(n.process(TouchSample::touch(1, TouchPhase::Started, Point::new(0.0, 0.0), t)));
        all.extend(n.process(TouchSample::touch(2, TouchPhase::Started, Point::new(50.0, 0.0), ms(t, 10))));
        all.extend(n.process(TouchSample::touch(2, TouchPhase::Moved, Point::new(60.0, 0.0), ms(t, 20))));
        all.extend(n.process(TouchSample::touch(1, TouchPhase::Ended, Point::new(0.0, 0.0), ms(t, 30))));
        all.extend(n.process(TouchSample::touch(2, TouchPhase::Ended, Point::new(60.0, 0.0), ms(t, 40))));

        let mut open = false;
        for event in &all {
            match event.kind {
                EventKind::Down => {
                    assert!(!open);
                    open = true;
                }
                EventKind::Move | EventKind::Up => {
                    assert!(open);
                    if event.kind == EventKind::Up {
                        open = false;
                    }
                }
                _ => {}
            }
        }
        assert!(!open);
    }

    #[test]
    fn test_mouse_samples_ignored() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        let mut sample = TouchSample::touch(1, TouchPhase::Started, Point::new(0.0, 0.0), t);
        sample.pointer_type = PointerType::Mouse;
        assert!(n.process(sample).is_empty());
        assert!(!n.is_gesture_open());
    }

    #[test]
    fn test_double_tap() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        let p = Point::new(100.0, 100.0);

        let first: Vec<_> = [
            n.process(TouchSample::touch(1, TouchPhase::Started, p, t)),
            n.process(TouchSample::touch(1, TouchPhase::Ended, p, ms(t, 80))),
        ]
        .concat();
        assert_eq!(kinds(&first), vec![EventKind::Down, EventKind::Up]);

        let p2 = Point::new(104.0, 98.0);
        let pressed = n.process(TouchSample::touch(2, TouchPhase::Started, p2, ms(t, 300)));
        assert!(pressed.is_empty());
        let released = n.process(TouchSample::touch(2, TouchPhase::Ended, p2, ms(t, 380)));
        assert_eq!(kinds(&released), vec![EventKind::DoubleActivate]);
        assert_eq!(released[0].position, p2);

        // A third tap starts a fresh gesture
        let third = n.process(TouchSample::touch(3, TouchPhase::Started, p2, ms(t, 500)));
        assert_eq!(kinds(&third), vec![EventKind::Down]);
    }

    #[test]
    fn test_second_tap_that_drags_is_a_drag() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        let p = Point::new(100.0, 100.0);
        n.process(TouchSample::touch(1, TouchPhase::Started, p, t));
        n.process(TouchSample::touch(1, TouchPhase::Ended, p, ms(t, 50)));

        assert!(n.process(TouchSample::touch(2, TouchPhase::Started, p, ms(t, 200))).is_empty());
        let events = n.process(TouchSample::touch(2, TouchPhase::Moved, Point::new(130.0, 100.0), ms(t, 220)));
        assert_eq!(kinds(&events), vec![EventKind::Down, EventKind::Move]);
        assert_eq!(events[0].position, p);
    }

    #[test]
    fn test_taps_too_far_apart() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        n.process(TouchSample::touch(1, TouchPhase::Started, Point::new(0.0, 0.0), t));
        n.process(TouchSample::touch(1, TouchPhase::Ended, Point::new(0.0, 0.0), ms(t, 50)));

        let events = n.process(TouchSample::touch(2, TouchPhase::Started, Point::new(200.0, 0.0), ms(t, 150)));
        assert_eq!(kinds(&events), vec![EventKind::Down]);
    }

    #[test]
    fn test_cancelled_candidate_emits_nothing() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        let p = Point::new(5.0, 5.0);
        n.process(TouchSample::touch(1, TouchPhase::Started, p, t));
        n.process(TouchSample::touch(1, TouchPhase::Ended, p, ms(t, 50)));
        n.process(TouchSample::touch(2, TouchPhase::Started, p, ms(t, 100)));

        let events = n.process(TouchSample::touch(2, TouchPhase::Cancelled, p, ms(t, 120)));
        assert!(events.is_empty());
    }

    #[test]
    fn test_pinch_emits_wheel_after_threshold() {
        let t = Instant::now();
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        n.process(TouchSample::touch(1, TouchPhase::Started, Point::new(0.0, 0.0), t));
        n.process(TouchSample::touch(2, TouchPhase::Started, Point::new(100.0, 0.0), ms(t, 5)));

        let below = n.process(TouchSample::touch(2, TouchPhase::Moved, Point::new(105.0, 0.0), ms(t, 10)));
        assert_eq!(kinds(&below), vec![EventKind::Move]);

        let start = n.process(TouchSample::touch(2, TouchPhase::Moved, Point::new(120.0, 0.0), ms(t, 20)));
        assert_eq!(kinds(&start), vec![EventKind::Move]);
        assert_eq!(n.state().last_scale, 1.2);

        let update = n.process(TouchSample::touch(2, TouchPhase::Moved, Point::new(130.0, 0.0), ms(t, 30)));
        let expected = ((1.3f64 - 1.2) * 25.0) as f32;
        assert_eq!(kinds(&update), vec![EventKind::Move, EventKind::Wheel(expected)]);
    }

    #[test]
    fn test_pinch_update_is_f32() {
        let mut n = GestureNormalizer::new(InteractionConfig::default());
        n.pinch_start(1.0);
        let event = n.pinch_update(1.1);
        let expected = ((1.1f64 - 1.0) * 25.0) as f32;
        assert_eq!(event.kind, EventKind::Wheel(expected));
        assert_eq!(n.state().last_scale, 1.1);

        let event = n.pinch_update(1.0);
        assert!(matches!(event.kind, EventKind::Wheel(d) if d < 0.0));
    }

    #[test]
    fn test_phase_from_winit() {
        assert_eq!(TouchPhase::from(winit::event::TouchPhase::Cancelled), TouchPhase::Cancelled);
        assert_eq!(TouchPhase::from(winit::event::TouchPhase::Started), TouchPhase::Started);
    }
}
