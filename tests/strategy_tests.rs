use pitwall::config::StrategyConfig;
use pitwall::kernel::snapshot::{Corner, Corners, TelemetrySnapshot};
use pitwall::kernel::strategy::{PitReason, StrategyCalculator, StrategyState, Urgency, PIT_WINDOW_UNLIMITED};

fn snapshot(lap: u32, fuel: f64) -> TelemetrySnapshot {
    TelemetrySnapshot {
        lap,
        fuel_level: fuel,
        is_on_track: true,
        ..Default::default()
    }
}

/// Feeds one tick per (lap, fuel) pair and returns the last state.
fn run(calc: &mut StrategyCalculator, laps: &[(u32, f64)]) -> StrategyState {
    let mut state = StrategyState::default();
    for &(lap, fuel) in laps {
        state = calc.update(&snapshot(lap, fuel));
    }
    state
}

#[test]
fn test_first_tick_has_unknown_fuel_use() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    let state = calc.update(&snapshot(1, 50.0));

    assert_eq!(state.fuel_per_lap, 0.0);
    assert!(state.laps_of_fuel.is_infinite());
    assert_eq!(state.pit_window, PIT_WINDOW_UNLIMITED);
    assert_eq!(state.urgency, Urgency::Ok);
    assert!(!state.needs_pit);
    assert_eq!(state.pit_reason, None);
}

#[test]
fn test_fuel_per_lap_measured_on_lap_change() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    // Several ticks within lap 1 only count the first one as lap start.
    let state = run(&mut calc, &[(1, 50.0), (1, 49.0), (1, 48.0), (2, 47.0)]);

    assert!((state.fuel_per_lap - 3.0).abs() < 1e-9);
    assert!((state.laps_of_fuel - 47.0 / 3.0).abs() < 1e-9);
    assert_eq!(state.pit_window, 13);
    assert_eq!(state.urgency, Urgency::Ok);
}

#[test]
fn test_low_usage_laps_are_filtered() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    // 0.2 used: caution lap, below the 0.5 minimum.
    let state = run(&mut calc, &[(1, 50.0), (2, 49.8)]);

    assert_eq!(calc.fuel_samples().count(), 0);
    assert!(state.laps_of_fuel.is_infinite());

    // The next real lap is measured from the filtered lap's reading.
    let state = run(&mut calc, &[(3, 46.8)]);
    assert!((state.fuel_per_lap - 3.0).abs() < 1e-9);
}

#[test]
fn test_fuel_window_keeps_last_five_laps() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    let state = run(
        &mut calc,
        &[(1, 100.0), (2, 99.0), (3, 98.0), (4, 97.0), (5, 96.0), (6, 95.0), (7, 89.0)],
    );

    let samples: Vec<f64> = calc.fuel_samples().collect();
    assert_eq!(samples, vec![1.0, 1.0, 1.0, 1.0, 6.0]);
    assert!((state.fuel_per_lap - 2.0).abs() < 1e-9);
}

#[test]
fn test_fuel_warning_and_critical() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    // 3 per lap, 12 left: 4 laps.
    let state = run(&mut calc, &[(1, 15.0), (2, 12.0)]);
    assert_eq!(state.urgency, Urgency::Warning);
    assert_eq!(state.pit_reason, Some(PitReason::FuelLow));
    assert!(state.needs_pit);
    assert_eq!(state.pit_window, 2);

    // Exactly at the critical line counts as critical.
    let state = run(&mut calc, &[(3, 9.0), (4, 6.0)]);
    assert!((state.laps_of_fuel - 2.0).abs() < 1e-9);
    assert_eq!(state.urgency, Urgency::Critical);
    assert_eq!(state.pit_reason, Some(PitReason::FuelCritical));
    assert_eq!(state.pit_window, 0);
}

#[test]
fn test_tire_wear_thresholds() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());

    let mut snap = snapshot(1, 50.0);
    snap.tire_wear = Corners::new(40.0, 72.0, 30.0, 35.0);
    let state = calc.update(&snap);
    assert_eq!(state.worst_tire_corner, Corner::RightFront);
    assert_eq!(state.worst_tire_wear, 72.0);
    assert_eq!(state.urgency, Urgency::Warning);
    assert_eq!(state.pit_reason, Some(PitReason::TiresWorn));

    snap.tire_wear = Corners::new(40.0, 72.0, 30.0, 85.0);
    let state = calc.update(&snap);
    assert_eq!(state.worst_tire_corner, Corner::RightRear);
    assert_eq!(state.urgency, Urgency::Critical);
    assert_eq!(state.pit_reason, Some(PitReason::TiresCritical));
}

#[test]
fn test_worst_tire_ties_go_to_earliest_corner() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());

    let mut snap = snapshot(1, 50.0);
    snap.tire_wear = Corners::uniform(20.0);
    assert_eq!(calc.update(&snap).worst_tire_corner, Corner::LeftFront);

    snap.tire_wear = Corners::new(10.0, 50.0, 20.0, 50.0);
    assert_eq!(calc.update(&snap).worst_tire_corner, Corner::RightFront);

    snap.tire_wear = Corners::new(10.0, 20.0, 60.0, 60.0);
    assert_eq!(calc.update(&snap).worst_tire_corner, Corner::LeftRear);
}

#[test]
fn test_fuel_reason_wins_urgency_tie() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    calc.update(&snapshot(1, 15.0));

    let mut snap = snapshot(2, 12.0);
    snap.tire_wear = Corners::new(75.0, 0.0, 0.0, 0.0);
    let state = calc.update(&snap);

    assert_eq!(state.urgency, Urgency::Warning);
    assert_eq!(state.pit_reason, Some(PitReason::FuelLow));
}

#[test]
fn test_worse_tire_urgency_beats_fuel_warning() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    calc.update(&snapshot(1, 15.0));

    let mut snap = snapshot(2, 12.0);
    snap.tire_wear = Corners::new(0.0, 0.0, 90.0, 0.0);
    let state = calc.update(&snap);

    assert_eq!(state.urgency, Urgency::Critical);
    assert_eq!(state.pit_reason, Some(PitReason::TiresCritical));
    assert!(state.pit_reason.is_some_and(PitReason::is_tires));
}

#[test]
fn test_reset_forgets_fuel_history() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    run(&mut calc, &[(1, 50.0), (2, 47.0)]);
    assert_eq!(calc.fuel_samples().count(), 1);

    calc.reset();
    assert_eq!(calc.fuel_samples().count(), 0);

    // First tick after reset is a fresh lap start, not a delta.
    let state = calc.update(&snapshot(1, 80.0));
    assert!(state.laps_of_fuel.is_infinite());
}

#[test]
fn test_example_worn_right_front_is_critical() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    let mut snap = snapshot(1, 50.0);
    snap.tire_wear = Corners::new(80.0, 90.0, 70.0, 75.0);

    let state = calc.update(&snap);
    assert_eq!(state.worst_tire_corner, Corner::RightFront);
    assert_eq!(state.worst_tire_wear, 90.0);
    assert_eq!(state.urgency, Urgency::Critical);
    assert!(state.pit_reason.is_some_and(|r| r.message().contains("Tires")));
}

#[test]
fn test_example_fuel_runs_critical() {
    let mut calc = StrategyCalculator::new(StrategyConfig::default());
    let state = run(&mut calc, &[(1, 20.0), (2, 17.5)]);
    assert!((state.fuel_per_lap - 2.5).abs() < 1e-9);

    let state = run(&mut calc, &[(2, 3.0)]);
    assert!((state.laps_of_fuel - 1.2).abs() < 1e-9);
    assert_eq!(state.urgency, Urgency::Critical);
    assert_eq!(state.pit_reason, Some(PitReason::FuelCritical));
}
