//! Integration tests for the session lifecycle engine.
//!
//! Drives the engine with a manual clock one simulated second per tick, the
//! way the background ticker does at 1 Hz.

mod common;

use std::sync::Arc;

use common::{classic_program, clock_at, engine_with, two_minute_program};
use saunaflow_core::{
    format_countdown, format_elapsed, EngineState, Event, Interval, JsonFileStore, KeyValueStore,
    ManualClock, SessionConfigPatch, SessionEngine, StopReason,
};

fn assert_exactly_one_active(state: &EngineState) {
    let active = [state.is_idle(), state.is_scheduled(), state.is_running()]
        .iter()
        .filter(|b| **b)
        .count();
    assert_eq!(active, 1, "state {state:?}");
}

#[test]
fn two_interval_program_completes_after_121_ticks() {
    let clock = clock_at(18, 0, 0);
    let mut engine = engine_with(&clock);
    engine.start_program_now(&two_minute_program()).unwrap();

    let mut stop_tick = None;
    for tick in 1..=121 {
        clock.advance_secs(1);
        let events = engine.tick();
        assert_exactly_one_active(engine.state());

        if tick < 60 {
            assert_eq!(engine.current_interval_index(), Some(0), "tick {tick}");
        }
        if tick == 60 {
            assert_eq!(engine.current_interval_index(), Some(1));
            assert_eq!(engine.interval_elapsed_seconds(), 0);
        }
        if (60..120).contains(&tick) {
            assert_eq!(engine.current_interval_index(), Some(1), "tick {tick}");
        }
        if events
            .iter()
            .any(|e| matches!(e, Event::SessionStopped { reason: StopReason::Completed, .. }))
        {
            stop_tick = Some(tick);
        }
    }

    assert_eq!(stop_tick, Some(120));
    assert!(engine.state().is_idle());
}

#[test]
fn interval_index_stays_in_bounds_after_long_sleep() {
    let clock = clock_at(18, 0, 0);
    let mut engine = engine_with(&clock);
    engine.start_program_now(&classic_program()).unwrap();

    clock.advance_secs(22 * 60);
    let events = engine.tick();
    let advanced = events
        .iter()
        .filter(|e| matches!(e, Event::IntervalAdvanced { .. }))
        .count();
    assert_eq!(advanced, 2);
    assert_eq!(engine.current_interval_index(), Some(2));
    assert_eq!(engine.interval_elapsed_seconds(), 2 * 60);

    clock.advance_secs(24 * 3600);
    let events = engine.tick();
    assert!(engine.state().is_idle());
    let Some(Event::SessionStopped { summary, .. }) = events.last() else {
        panic!("expected the run to finish, got {events:?}");
    };
    assert!(summary.completed);
    assert_eq!(summary.completed_intervals, 3);
    assert_eq!(summary.elapsed_secs, 22 * 60 + 24 * 3600);
}

#[test]
fn running_program_is_isolated_from_catalog_edits() {
    let clock = clock_at(18, 0, 0);
    let mut engine = engine_with(&clock);
    engine.catalog_mut().add(classic_program()).unwrap();
    engine.start_program_by_id("classic").unwrap();

    let mut edited = classic_program();
    edited.intervals[0] = Interval::sauna("round-1", 2, None);
    edited.soundscape = Some("thunder".into());
    engine.catalog_mut().update(edited).unwrap();

    let running = engine.state().program().unwrap();
    assert_eq!(running.intervals[0].duration_minutes, 15);
    assert_eq!(running.soundscape.as_deref(), Some("lakeside"));
    assert_eq!(engine.catalog().get("classic").unwrap().intervals[0].duration_minutes, 2);

    clock.advance_secs(3 * 60);
    engine.tick();
    assert_eq!(engine.current_interval_index(), Some(0));
}

#[test]
fn catalog_removal_does_not_stop_the_run() {
    let clock = clock_at(18, 0, 0);
    let mut engine = engine_with(&clock);
    engine.catalog_mut().add(classic_program()).unwrap();
    engine.start_program_by_id("classic").unwrap();
    engine.catalog_mut().remove("classic").unwrap();

    clock.advance_secs(60);
    engine.tick();
    assert!(engine.state().is_running());
    assert_eq!(engine.state().program().map(|p| p.name.as_str()), Some("Finnish classic"));
}

#[test]
fn total_program_duration_is_sum_of_intervals() {
    assert_eq!(classic_program().total_duration_minutes(), 35);
    assert_eq!(two_minute_program().total_duration_minutes(), 2);
}

#[test]
fn display_helpers() {
    assert_eq!(format_elapsed(125), "02:05");
    assert_eq!(format_countdown(3661), "1h 1m");
    assert_eq!(format_countdown(45), "45s");
}

#[test]
fn stop_twice_is_same_as_once() {
    let clock = clock_at(18, 0, 0);
    let mut engine = engine_with(&clock);
    engine.start_session();
    engine.stop_session();
    let after_first = engine.state().clone();
    assert!(engine.stop_session().is_none());
    assert_eq!(engine.state(), &after_first);
    assert!(engine.state().is_idle());
}

#[test]
fn clock_moving_backward_does_not_rewind_or_complete() {
    let clock = clock_at(18, 0, 0);
    let mut engine = engine_with(&clock);
    engine.start_program_now(&two_minute_program()).unwrap();

    clock.advance_secs(45);
    engine.tick();
    assert_eq!(engine.elapsed_seconds(), 45);

    clock.advance_secs(-3600);
    let events = engine.tick();
    assert!(events.is_empty());
    assert_eq!(engine.elapsed_seconds(), 45);
    assert_eq!(engine.current_interval_index(), Some(0));
    assert!(engine.state().is_running());
}

#[test]
fn config_and_catalog_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let clock = ManualClock::at_ms(0);

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&path));
        let mut engine = SessionEngine::new(store, Arc::new(clock.clone()));
        engine
            .update_session_config(SessionConfigPatch {
                duration_minutes: Some(25),
                heat_celsius: Some(95),
                humidity_percent: Some(33),
            })
            .unwrap();
        engine.catalog_mut().add(classic_program()).unwrap();
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&path));
    let engine = SessionEngine::new(store, Arc::new(clock));
    let config = engine.session_config();
    assert_eq!(config.duration_minutes, 25);
    assert_eq!(config.heat_celsius, 95);
    assert_eq!(config.humidity_percent, 35);
    assert_eq!(engine.catalog().len(), 1);
    assert!(engine.state().is_idle());
}

#[test]
fn corrupt_store_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, r#"{"session_config":"{oops","programs":"[{]"}"#).unwrap();

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&path));
    let engine = SessionEngine::new(store, Arc::new(ManualClock::at_ms(0)));
    assert_eq!(engine.session_config(), Default::default());
    assert!(engine.catalog().is_empty());
}
