use hawser_system::{End, MooringSystem};
use integration_tests::{CATENARY, CATENARY_FAIRLEAD, at_rest, hold, layout};

fn slack_catenary() -> String {
    let text = layout(CATENARY, "rk4", "0.001 s");
    format!("{text}\n[initial_conditions]\nmax_time = \"40 s\"\n")
}

#[test]
fn slack_catenary_settles_from_its_straight_start() {
    let text = slack_catenary();
    let straight = at_rest(&text, &CATENARY_FAIRLEAD);

    let mut settled = MooringSystem::from_toml(&text).unwrap();
    settled.init(&CATENARY_FAIRLEAD, &[0.0; 3], false).unwrap();

    assert_eq!(settled.time(), 0.0);
    assert_eq!(settled.engine().n_steps(), 0);

    let chord = straight.lines()[0].nodes()[2];
    let sagged = settled.lines()[0].nodes()[2];
    assert!(sagged.z < chord.z - 1.0, "middle node at {sagged:?} did not sag");
    assert!(settled.lines()[0].end_tension(End::B) > 0.0);

    // Held still, a settled line barely moves.
    hold(&mut settled, &CATENARY_FAIRLEAD, 0.1, 5);
    let drift = (settled.lines()[0].nodes()[2] - sagged).norm();
    assert!(drift < 0.1, "settled line drifted {drift} m");
}

#[test]
fn settled_fairlead_load_is_steady() {
    let text = slack_catenary();
    let mut system = MooringSystem::from_toml(&text).unwrap();
    system.init(&CATENARY_FAIRLEAD, &[0.0; 3], false).unwrap();

    let first = system.net_forces();
    let later = hold(&mut system, &CATENARY_FAIRLEAD, 0.1, 5);

    assert!(first[2] < 0.0);
    for (a, b) in first.iter().zip(&later) {
        assert!((a - b).abs() <= 0.01 * first[2].abs(), "load moved from {a} to {b}");
    }
}
