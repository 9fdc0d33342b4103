//! End-to-end session scenarios driven through the public API.

use proptest::prelude::*;
use trackmeet_core::{
    ActivityType, Clock, Database, EngineSettings, Event, GeoFix, Leaderboard, ManualClock, ManualTicker,
    ReplaySource, SessionEngine, SessionError, SessionPhase, Tier,
};

type Engine = SessionEngine<ReplaySource, ManualTicker, ManualClock>;

const T0: u64 = 1_700_000_000_000;

fn engine(countdown_ticks: u32) -> (Engine, ReplaySource, ManualTicker, ManualClock) {
    let source = ReplaySource::granted();
    let ticker = ManualTicker::new();
    let clock = ManualClock::new(T0);
    let engine = SessionEngine::new(source.clone(), ticker.clone(), clock.clone()).with_settings(
        EngineSettings {
            countdown_ticks,
            ..EngineSettings::default()
        },
    );
    (engine, source, ticker, clock)
}

#[test]
fn run_of_two_segments_yields_consistent_metrics() {
    let (mut engine, _, _, clock) = engine(0);
    engine.start(ActivityType::Running).unwrap();

    let t1 = T0 + 30_000;
    let t2 = T0 + 60_000;

    engine.on_fix(GeoFix::new(0.0, 0.0, T0));
    clock.set(t1);
    engine.on_fix(GeoFix::new(0.0, 0.001, t1));
    engine.tick();
    clock.set(t2);
    engine.on_fix(GeoFix::new(0.0, 0.002, t2));
    engine.tick();

    let Ok(Event::SessionFinished { summary }) = engine.stop() else {
        panic!("stop should finish the session");
    };

    assert!((summary.distance_meters - 222.39).abs() < 1.0, "{}", summary.distance_meters);
    assert_eq!(summary.elapsed_seconds, (t2 - T0) / 1000);

    let expected_speed = (summary.distance_meters / 1000.0) / (60.0 / 3600.0);
    let expected_pace = 1.0 / (summary.distance_meters / 1000.0);
    assert!((summary.average_speed_kmh - expected_speed).abs() < 1e-9);
    assert!((summary.pace_min_per_km - expected_pace).abs() < 1e-9);
    assert_eq!(summary.tier, Tier::Beginner);
    assert!((summary.stamina_percent - 99.6).abs() < 1e-9);
}

#[test]
fn stop_without_subscription_is_tolerated() {
    // Rep activities never subscribe, so teardown runs with no watcher.
    let (mut engine, source, _, _) = engine(0);
    engine.start(ActivityType::SitUps).unwrap();
    assert!(!engine.is_subscribed());

    assert!(engine.stop().is_ok());
    assert!(matches!(
        engine.stop(),
        Err(SessionError::InvalidTransition { .. })
    ));
    assert_eq!(engine.phase(), SessionPhase::Finished);
    assert_eq!(source.unsubscribe_calls(), 0);
}

#[test]
fn signal_gap_keeps_clock_metrics_moving() {
    let (mut engine, _, _, clock) = engine(0);
    engine.start(ActivityType::EnduranceRun).unwrap();
    engine.on_fix(GeoFix::new(10.0, 10.0, T0));
    engine.on_fix(GeoFix::new(10.0, 10.001, T0 + 1_000));
    let before = engine.session().unwrap().distance_m();

    for _ in 0..30 {
        clock.advance(1_000);
        engine.tick();
    }
    let metrics = engine.metrics();
    assert_eq!(metrics.distance_meters, before);
    assert_eq!(metrics.elapsed_seconds, 30);
    assert!(metrics.stamina_percent < 100.0);
}

#[test]
fn finished_sessions_feed_a_persisted_leaderboard() {
    let mut db = Database::open_memory().unwrap();
    let mut board = Leaderboard::new(ActivityType::PushUps);

    for (subject, reps) in [("asha", 45u32), ("bilal", 95), ("chen", 45)] {
        let (mut engine, _, _, _) = engine(0);
        engine.start(ActivityType::PushUps).unwrap();
        for _ in 0..reps {
            engine.record_rep().unwrap();
        }
        engine.stop().unwrap();
        let summary = engine.archive(&mut db).unwrap();
        let entry = summary.to_entry(subject, None);
        db.submit_entry(ActivityType::PushUps, &entry).unwrap();
        board.submit(entry);
    }

    let stored = db.leaderboard(ActivityType::PushUps).unwrap();
    assert_eq!(stored.ranked(None), board.ranked(None));

    let ranked = board.ranked(None);
    let names: Vec<_> = ranked.iter().map(|r| r.entry.subject_id.as_str()).collect();
    assert_eq!(names, ["bilal", "asha", "chen"]);
    assert_eq!(ranked[0].entry.tier, Tier::Elite);
    assert_eq!(ranked[1].entry.tier, Tier::Intermediate);
    assert_eq!(db.recent_sessions(10).unwrap().len(), 3);
}

proptest! {
    #[test]
    fn engine_distance_is_monotonic(
        steps in proptest::collection::vec((-0.01f64..0.01, -0.01f64..0.01, 0u64..5_000), 1..50)
    ) {
        let (mut engine, _, _, clock) = engine(0);
        engine.start(ActivityType::Running).unwrap();
        let (mut lat, mut lon) = (12.0, 77.0);
        let mut previous = 0.0;
        for (dlat, dlon, dt) in steps {
            lat += dlat;
            lon += dlon;
            clock.advance(dt);
            engine.on_fix(GeoFix::new(lat, lon, clock.now_ms()));
            engine.tick();
            let distance = engine.session().unwrap().distance_m();
            prop_assert!(distance >= previous);
            previous = distance;
        }
    }
}
