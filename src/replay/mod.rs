//! Replay controller - deterministic playback of the event timeline
//!
//! A small state machine (stopped / paused / playing) over a fixed,
//! sequence-ordered timeline. While playing, one spawned timer task ticks
//! every `base_interval / speed` and advances the index; every transition
//! away from playing aborts that task, so at most one timer is ever
//! outstanding. Reaching the last index stops playback and fires the
//! completion callback exactly once. The derived state at the current index
//! is recomputed on demand, never cached, which keeps playback and direct
//! jumps indistinguishable.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::derive::StateDerivationEngine;
use crate::error::{LedgerError, Result};
use crate::store::EventStore;
use crate::types::{
    next_speed, prev_speed, snap_speed, Event, PlaybackState, ReplayOptions, ReplayStatus,
};

type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

struct ControllerInner {
    events: Vec<Event>,
    state: PlaybackState,
    current_index: usize,
    speed: f64,
    base_interval: Duration,
    timer: Option<JoinHandle<()>>,
    on_complete: Option<CompletionCallback>,
}

impl ControllerInner {
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    fn last_index(&self) -> usize {
        self.events.len().saturating_sub(1)
    }

    /// One timer tick. Returns the completion callback when the last index
    /// was reached, so the caller can invoke it outside the lock.
    fn advance_tick(&mut self) -> Option<CompletionCallback> {
        if self.current_index < self.last_index() {
            self.current_index += 1;
        }
        if self.current_index >= self.last_index() {
            self.state = PlaybackState::Stopped;
            self.timer = None;
            return self.on_complete.clone();
        }
        None
    }
}

/// Steps through a timeline of events with live state derivation.
pub struct ReplayController {
    inner: Arc<Mutex<ControllerInner>>,
    engine: StateDerivationEngine,
}

impl ReplayController {
    /// Controller over a fixed timeline; events are sorted by sequence.
    /// An off-ladder speed in `options` snaps to 1x so the timer interval
    /// stays representable.
    pub fn new(mut events: Vec<Event>, engine: StateDerivationEngine, options: ReplayOptions) -> Self {
        events.sort_by_key(|e| e.sequence);
        Self {
            inner: Arc::new(Mutex::new(ControllerInner {
                events,
                state: PlaybackState::Stopped,
                current_index: 0,
                speed: snap_speed(options.speed),
                base_interval: options.base_interval,
                timer: None,
                on_complete: None,
            })),
            engine,
        }
    }

    /// Controller over a store's full log.
    pub fn from_store(store: &EventStore, engine: StateDerivationEngine, options: ReplayOptions) -> Self {
        Self::new(store.all_events(), engine, options)
    }

    /// Callback fired exactly once when playback reaches the last index.
    pub fn set_on_complete<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.lock().on_complete = Some(Arc::new(callback));
    }

    /// Start or resume playback. Requires a tokio runtime; the timer runs
    /// as a spawned task. No-op while already playing or when the timeline
    /// is empty.
    pub fn play(&self) {
        let mut inner = self.inner.lock();
        if inner.state == PlaybackState::Playing || inner.events.is_empty() {
            return;
        }
        inner.cancel_timer();
        inner.state = PlaybackState::Playing;
        debug!(index = inner.current_index, speed = inner.speed, "playback started");
        inner.timer = Some(self.spawn_timer());
    }

    /// Halt playback, keeping the current index.
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        inner.cancel_timer();
        inner.state = PlaybackState::Paused;
    }

    /// Halt playback and rewind to index 0.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.cancel_timer();
        inner.state = PlaybackState::Stopped;
        inner.current_index = 0;
    }

    /// Move one index forward, clamped at the end. Forces paused.
    pub fn step_forward(&self) {
        let mut inner = self.inner.lock();
        inner.cancel_timer();
        inner.state = PlaybackState::Paused;
        inner.current_index = (inner.current_index + 1).min(inner.last_index());
    }

    /// Move one index back, clamped at 0. Forces paused.
    pub fn step_backward(&self) {
        let mut inner = self.inner.lock();
        inner.cancel_timer();
        inner.state = PlaybackState::Paused;
        inner.current_index = inner.current_index.saturating_sub(1);
    }

    /// Reposition, clamped into range. Playback state is untouched: a
    /// running timer simply continues from the new index.
    pub fn jump_to_index(&self, index: usize) {
        let mut inner = self.inner.lock();
        inner.current_index = index.min(inner.last_index());
    }

    /// Reposition to the event with the given id.
    pub fn jump_to_event(&self, event_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let index = inner
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or_else(|| LedgerError::not_found("event", event_id))?;
        inner.current_index = index;
        Ok(())
    }

    /// Map a progress fraction in [0, 1] proportionally onto the timeline.
    pub fn seek(&self, progress: f64) {
        let mut inner = self.inner.lock();
        if inner.events.is_empty() {
            return;
        }
        let clamped = progress.clamp(0.0, 1.0);
        inner.current_index = (clamped * inner.last_index() as f64).round() as usize;
    }

    /// Switch to the next ladder speed (wraps from 8x to 0.25x). A running
    /// timer restarts so the new interval applies immediately.
    pub fn next_speed(&self) -> f64 {
        self.change_speed(next_speed)
    }

    /// Switch to the previous ladder speed (wraps from 0.25x to 8x).
    pub fn prev_speed(&self) -> f64 {
        self.change_speed(prev_speed)
    }

    fn change_speed(&self, step: fn(f64) -> f64) -> f64 {
        let mut inner = self.inner.lock();
        inner.speed = step(inner.speed);
        if inner.state == PlaybackState::Playing {
            inner.cancel_timer();
            inner.timer = Some(self.spawn_timer());
        }
        inner.speed
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state
    }

    pub fn current_index(&self) -> usize {
        self.inner.lock().current_index
    }

    pub fn speed(&self) -> f64 {
        self.inner.lock().speed
    }

    pub fn total_events(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn current_event(&self) -> Option<Event> {
        let inner = self.inner.lock();
        inner.events.get(inner.current_index).cloned()
    }

    /// Derived state at the current index, recomputed per call.
    pub fn current_state(&self) -> Value {
        let inner = self.inner.lock();
        match inner.events.get(inner.current_index) {
            Some(event) => self
                .engine
                .derive_state(&inner.events, event.sequence, None),
            None => self.engine.initial_state().clone(),
        }
    }

    pub fn status(&self) -> ReplayStatus {
        let inner = self.inner.lock();
        let progress = if inner.events.len() > 1 {
            inner.current_index as f64 / inner.last_index() as f64
        } else {
            0.0
        };
        ReplayStatus {
            state: inner.state,
            current_index: inner.current_index,
            total_events: inner.events.len(),
            speed: inner.speed,
            progress,
        }
    }

    /// One normalized scrubber position per event: `index / (total - 1)`,
    /// or 0 for a single-event timeline.
    pub fn markers(&self) -> Vec<f64> {
        let inner = self.inner.lock();
        let total = inner.events.len();
        if total <= 1 {
            return vec![0.0; total];
        }
        (0..total)
            .map(|i| i as f64 / (total - 1) as f64)
            .collect()
    }

    fn spawn_timer(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                let delay = {
                    let guard = inner.lock();
                    if guard.state != PlaybackState::Playing {
                        break;
                    }
                    tick_interval(guard.base_interval, guard.speed)
                };
                tokio::time::sleep(delay).await;

                let completed = {
                    let mut guard = inner.lock();
                    if guard.state != PlaybackState::Playing {
                        break;
                    }
                    guard.advance_tick()
                };
                if let Some(callback) = completed {
                    callback();
                    break;
                }
            }
        })
    }
}

impl Drop for ReplayController {
    fn drop(&mut self) {
        self.inner.lock().cancel_timer();
    }
}

/// Tick delay for a speed; floored so a zero base interval cannot spin.
fn tick_interval(base: Duration, speed: f64) -> Duration {
    Duration::from_secs_f64((base.as_secs_f64() / speed).max(0.001))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::ReducerMap;
    use crate::types::EventCategory;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tick_event(sequence: u64) -> Event {
        Event::new(sequence, EventCategory::Game, "round_advanced", json!({}))
            .with_id(format!("e{sequence}"))
    }

    fn counting_engine() -> StateDerivationEngine {
        let mut map = ReducerMap::new();
        map.register(EventCategory::Game, "round_advanced", |mut state, _| {
            let round = state.get("round").and_then(Value::as_i64).unwrap_or(0);
            state["round"] = json!(round + 1);
            state
        });
        StateDerivationEngine::new(map).with_initial_state(json!({"round": 0}))
    }

    fn controller(count: u64) -> ReplayController {
        let events = (1..=count).map(tick_event).collect();
        let options = ReplayOptions::default()
            .with_base_interval(Duration::from_millis(100));
        ReplayController::new(events, counting_engine(), options)
    }

    #[test]
    fn test_initial_state_stopped_at_zero() {
        let controller = controller(3);
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(controller.current_index(), 0);
        assert_eq!(controller.total_events(), 3);
    }

    #[test]
    fn test_steps_clamp_and_pause() {
        let controller = controller(3);

        controller.step_forward();
        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.state(), PlaybackState::Paused);

        controller.step_forward();
        controller.step_forward();
        // Clamped at the last index
        assert_eq!(controller.current_index(), 2);

        controller.step_backward();
        assert_eq!(controller.current_index(), 1);
        controller.step_backward();
        controller.step_backward();
        assert_eq!(controller.current_index(), 0);
    }

    #[test]
    fn test_jump_and_seek_clamp() {
        let controller = controller(5);

        controller.jump_to_index(99);
        assert_eq!(controller.current_index(), 4);

        controller.seek(0.5);
        assert_eq!(controller.current_index(), 2);
        controller.seek(-3.0);
        assert_eq!(controller.current_index(), 0);
        controller.seek(42.0);
        assert_eq!(controller.current_index(), 4);
    }

    #[test]
    fn test_jump_to_event_by_id() {
        let controller = controller(3);
        controller.jump_to_event("e2").unwrap();
        assert_eq!(controller.current_index(), 1);

        let err = controller.jump_to_event("missing").unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { kind: "event", .. }));
    }

    #[test]
    fn test_stop_resets_index() {
        let controller = controller(3);
        controller.jump_to_index(2);
        controller.stop();
        assert_eq!(controller.current_index(), 0);
        assert_eq!(controller.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_markers_normalized() {
        assert_eq!(controller(3).markers(), vec![0.0, 0.5, 1.0]);
        assert_eq!(controller(1).markers(), vec![0.0]);
        assert!(controller(0).markers().is_empty());
    }

    #[test]
    fn test_current_state_tracks_index() {
        let controller = controller(3);
        assert_eq!(controller.current_state(), json!({"round": 1}));

        controller.jump_to_index(2);
        assert_eq!(controller.current_state(), json!({"round": 3}));

        controller.step_backward();
        assert_eq!(controller.current_state(), json!({"round": 2}));
    }

    #[test]
    fn test_state_same_for_any_path_to_index() {
        // Step-by-step vs direct jump must derive identical state
        let stepped = controller(4);
        stepped.step_forward();
        stepped.step_forward();

        let jumped = controller(4);
        jumped.jump_to_index(2);

        assert_eq!(stepped.current_state(), jumped.current_state());
    }

    #[test]
    fn test_speed_ladder_on_controller() {
        let controller = controller(3);
        assert_eq!(controller.next_speed(), 2.0);
        assert_eq!(controller.next_speed(), 4.0);
        assert_eq!(controller.prev_speed(), 2.0);
    }

    #[test]
    fn test_off_ladder_speed_snapped_at_construction() {
        // Struct-literal options bypass with_speed; new() still snaps
        let options = ReplayOptions {
            base_interval: Duration::from_millis(100),
            speed: 0.0,
        };
        let controller = ReplayController::new(vec![tick_event(1)], counting_engine(), options);
        assert_eq!(controller.speed(), 1.0);
        assert_eq!(controller.status().speed, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_advances_while_playing() {
        let controller = controller(3);
        controller.play();
        assert_eq!(controller.state(), PlaybackState::Playing);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(controller.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_timer() {
        let controller = controller(5);
        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(controller.current_index(), 1);

        controller.pause();
        tokio::time::sleep(Duration::from_millis(500)).await;
        // No ticks after pause
        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.state(), PlaybackState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_fires_once_and_stops() {
        let controller = controller(3);
        let fired = Arc::new(AtomicUsize::new(0));
        let observer = fired.clone();
        controller.set_on_complete(move || {
            observer.fetch_add(1, Ordering::SeqCst);
        });

        controller.play();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(controller.current_index(), 2);
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_divides_interval() {
        let controller = controller(5);
        controller.next_speed(); // 2x -> 50ms ticks
        controller.play();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(controller.current_index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_during_playback_keeps_playing() {
        let controller = controller(5);
        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(controller.current_index(), 1);

        controller.jump_to_index(3);
        assert_eq!(controller.state(), PlaybackState::Playing);

        // Next tick reaches the last index and stops
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.current_index(), 4);
        assert_eq!(controller.state(), PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_speed_playback_still_completes() {
        // Speed 0.0 must not stall the timer in Playing forever
        let events: Vec<Event> = (1..=2).map(tick_event).collect();
        let options = ReplayOptions::default()
            .with_base_interval(Duration::from_millis(100))
            .with_speed(0.0);
        let controller = ReplayController::new(events, counting_engine(), options);
        assert_eq!(controller.speed(), 1.0);

        let fired = Arc::new(AtomicUsize::new(0));
        let observer = fired.clone();
        controller.set_on_complete(move || {
            observer.fetch_add(1, Ordering::SeqCst);
        });

        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_on_empty_timeline_is_noop() {
        let controller = controller(0);
        controller.play();
        assert_eq!(controller.state(), PlaybackState::Stopped);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(controller.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_resumes_from_pause() {
        let controller = controller(4);
        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;
        controller.pause();
        assert_eq!(controller.current_index(), 1);

        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(controller.current_index(), 2);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }
}
