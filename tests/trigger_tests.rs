use pitwall::kernel::event::{EventDetail, EventKind, RaceEvent};
use pitwall::kernel::snapshot::Corner;
use pitwall::kernel::strategy::{PitReason, StrategyState, Urgency};
use pitwall::kernel::trigger::{fallback_message, DispatchReason, TriggerPolicy};

fn event(detail: EventDetail, at: f64) -> RaceEvent {
    RaceEvent::new(detail, at)
}

fn calm() -> StrategyState {
    StrategyState {
        laps_of_fuel: 12.34,
        fuel_per_lap: 2.5,
        ..Default::default()
    }
}

fn urgent(urgency: Urgency, reason: PitReason) -> StrategyState {
    StrategyState {
        laps_of_fuel: 1.5,
        fuel_per_lap: 2.5,
        worst_tire_corner: Corner::RightFront,
        worst_tire_wear: 88.0,
        urgency,
        needs_pit: true,
        pit_reason: Some(reason),
        ..Default::default()
    }
}

#[test]
fn test_first_event_dispatches_then_cooldown_applies() {
    let mut policy = TriggerPolicy::new(10.0);
    let pb = vec![event(EventDetail::PersonalBest { lap_time: 88.1 }, 0.0)];

    let dispatch = policy.evaluate(&pb, &calm(), 0.0).expect("first event dispatches");
    assert_eq!(dispatch.reason, DispatchReason::Event { kind: EventKind::PersonalBest });
    assert!(!dispatch.bypassed_cooldown);
    assert!(!dispatch.priority);
    assert_eq!(policy.last_dispatch(), Some(0.0));

    assert!(policy.evaluate(&pb, &calm(), 5.0).is_none());
    assert!(policy.evaluate(&pb, &calm(), 9.9).is_none());
    assert!(policy.evaluate(&pb, &calm(), 10.0).is_some());
}

#[test]
fn test_no_events_no_escalation_no_dispatch() {
    let mut policy = TriggerPolicy::new(10.0);
    assert!(policy.evaluate(&[], &calm(), 0.0).is_none());
    assert_eq!(policy.last_dispatch(), None);
}

#[test]
fn test_critical_event_bypasses_cooldown() {
    let mut policy = TriggerPolicy::new(10.0);
    let pb = vec![event(EventDetail::PersonalBest { lap_time: 88.1 }, 0.0)];
    policy.evaluate(&pb, &calm(), 0.0);

    let defend = vec![
        event(EventDetail::GapDefend { gap_behind: 0.4 }, 1.0),
        event(EventDetail::PeriodicUpdate { lap: 5, position: 3, laps_of_fuel: 8.0 }, 1.0),
    ];
    let dispatch = policy.evaluate(&defend, &calm(), 1.0).expect("critical always dispatches");
    assert_eq!(dispatch.reason, DispatchReason::CriticalEvent { kind: EventKind::GapDefend });
    assert!(dispatch.bypassed_cooldown);
    assert!(dispatch.priority);
    assert_eq!(dispatch.trigger.map(|e| e.kind), Some(EventKind::GapDefend));
    assert_eq!(policy.last_dispatch(), Some(1.0));
}

#[test]
fn test_transition_into_critical_urgency_dispatches_same_tick() {
    let mut policy = TriggerPolicy::new(10.0);
    let pb = vec![event(EventDetail::PersonalBest { lap_time: 88.1 }, 0.0)];
    policy.evaluate(&pb, &calm(), 0.0);

    let critical = urgent(Urgency::Critical, PitReason::TiresCritical);
    let dispatch = policy.evaluate(&[], &critical, 2.0).expect("entering critical dispatches");
    assert_eq!(dispatch.reason, DispatchReason::CriticalUrgency);
    assert!(dispatch.bypassed_cooldown);
    assert!(dispatch.priority);

    // Staying critical is no longer a transition.
    assert!(policy.evaluate(&[], &critical, 3.0).is_none());
}

#[test]
fn test_urgency_escalation_waits_for_cooldown() {
    let mut policy = TriggerPolicy::new(10.0);
    let pb = vec![event(EventDetail::PersonalBest { lap_time: 88.1 }, 0.0)];
    policy.evaluate(&pb, &calm(), 0.0);

    let warning = urgent(Urgency::Warning, PitReason::FuelLow);
    // Cooling down: escalation is remembered as seen and not replayed.
    assert!(policy.evaluate(&[], &warning, 5.0).is_none());
    assert!(policy.evaluate(&[], &warning, 11.0).is_none());

    let mut fresh = TriggerPolicy::new(10.0);
    let dispatch = fresh.evaluate(&[], &warning, 0.0).expect("escalation dispatches");
    assert_eq!(
        dispatch.reason,
        DispatchReason::UrgencyEscalated {
            from: Urgency::Ok,
            to: Urgency::Warning
        }
    );
    assert_eq!(dispatch.reason.label(), "escalation:OK->WARNING");
    assert!(dispatch.trigger.is_none());
}

#[test]
fn test_decide_does_not_commit() {
    let policy = TriggerPolicy::new(10.0);
    let pb = vec![event(EventDetail::PersonalBest { lap_time: 88.1 }, 0.0)];

    assert!(policy.decide(&pb, &calm(), 0.0).is_some());
    assert!(policy.decide(&pb, &calm(), 0.0).is_some());
    assert_eq!(policy.last_dispatch(), None);
}

#[test]
fn test_reset_clears_timing() {
    let mut policy = TriggerPolicy::new(10.0);
    let pb = vec![event(EventDetail::PersonalBest { lap_time: 88.1 }, 0.0)];
    policy.evaluate(&pb, &calm(), 0.0);
    assert!(!policy.cooldown_elapsed(1.0));

    policy.reset();
    assert!(policy.cooldown_elapsed(1.0));
    assert!(policy.evaluate(&pb, &calm(), 1.0).is_some());
}

#[test]
fn test_fallback_messages() {
    assert_eq!(
        fallback_message(&urgent(Urgency::Critical, PitReason::FuelCritical), 4, None),
        "Box now! Fuel critical, 1.5 laps remaining."
    );
    assert_eq!(
        fallback_message(&urgent(Urgency::Critical, PitReason::TiresCritical), 4, None),
        "Box now! Tires critical, RF at 88%."
    );
    assert_eq!(
        fallback_message(&urgent(Urgency::Warning, PitReason::FuelLow), 4, None),
        "Fuel getting low. 1.5 laps remaining. Plan your pit stop."
    );
    assert_eq!(
        fallback_message(&urgent(Urgency::Warning, PitReason::TiresWorn), 4, None),
        "Tires wearing. RF at 88%. Consider pitting."
    );
    assert_eq!(fallback_message(&calm(), 4, None), "Lap update. P4, 12.3 laps of fuel.");
    assert_eq!(fallback_message(&StrategyState::default(), 7, None), "Lap update. P7.");
}

#[test]
fn test_fallback_prefers_critical_trigger_over_warning() {
    let defend = event(EventDetail::GapDefend { gap_behind: 0.4 }, 0.0);
    let warning = urgent(Urgency::Warning, PitReason::FuelLow);
    assert_eq!(fallback_message(&warning, 2, Some(&defend)), "Defend! 0.4 behind");

    let pb = event(EventDetail::PersonalBest { lap_time: 88.1 }, 0.0);
    assert_eq!(fallback_message(&calm(), 2, Some(&pb)), "Personal best! 88.100");
    assert_eq!(
        fallback_message(&warning, 2, Some(&pb)),
        "Fuel getting low. 1.5 laps remaining. Plan your pit stop."
    );
}
