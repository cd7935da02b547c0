use super::*;

use approx::assert_relative_eq;
use hawser_core::{PhysicalObject, Role};

use crate::{env::Env, objects::End};

/// One line hanging level between an anchor and a coupled fairlead.
const LEVEL_LINE: &str = r#"
    scheme = "rk4"
    dt_m = "0.01 s"

    [[connections]]
    id = 1
    role = "fixed"
    position = [0.0, 0.0, -50.0]

    [[connections]]
    id = 2
    role = "coupled"
    position = [30.0, 0.0, -50.0]

    [[lines]]
    id = 1
    segments = 3
    length = 30.0
    diameter = 0.05
    mass_per_length = 10.0
    ea = 1.0e6
    end_a = { connection = 1 }
    end_b = { connection = 2 }
"#;

const FAIRLEAD: [f64; 3] = [30.0, 0.0, -50.0];

fn level_line() -> MooringSystem {
    let mut system = MooringSystem::from_toml(LEVEL_LINE).unwrap();
    system.init(&FAIRLEAD, &[0.0; 3], true).unwrap();
    system
}

fn with_failure(time: f64) -> String {
    format!("{LEVEL_LINE}\n[[failures]]\nconnection = 1\nlines = [1]\ntime = {time}\n")
}

#[test]
fn fairlead_carries_half_a_segment_of_slack_line() {
    let mut system = level_line();
    assert_eq!(system.total_coupled_dof(), 3);
    assert_eq!(system.total_free_dof(), 12);

    let forces = system.net_forces();
    assert_eq!(forces.len(), 3);

    // Unstretched, so only the end node's submerged weight remains.
    let env = Env::default();
    let volume = std::f64::consts::PI * 0.025 * 0.025 * 5.0;
    let expected = (env.rho * volume - 50.0) * env.g;
    assert_relative_eq!(forces[0], 0.0, epsilon = 1e-6);
    assert_relative_eq!(forces[1], 0.0, epsilon = 1e-6);
    assert_relative_eq!(forces[2], expected, max_relative = 1e-12);
}

#[test]
fn bodies_report_before_connections() {
    let text = format!(
        "{LEVEL_LINE}
        [[bodies]]
        id = 1
        role = \"coupled\"
        pose = [0.0, 0.0, -10.0, 0.0, 0.0, 0.0]
        mass = 1000.0
        inertia = [1.0, 1.0, 1.0]
        "
    );
    let mut system = MooringSystem::from_toml(&text).unwrap();
    assert_eq!(system.total_coupled_dof(), 9);

    let x = [0.0, 0.0, -10.0, 0.0, 0.0, 0.0, 30.0, 0.0, -50.0];
    system.init(&x, &[0.0; 9], true).unwrap();

    let forces = system.net_forces();
    assert_eq!(forces.len(), 9);
    assert_relative_eq!(forces[2], -1000.0 * 9.81, max_relative = 1e-12);
    for moment in &forces[3..6] {
        assert_relative_eq!(*moment, 0.0);
    }
    assert!(forces[8] < 0.0);
}

#[test]
fn coupling_step_is_split_into_internal_steps() {
    let mut system = level_line();

    let forces = system.step(&FAIRLEAD, &[1.0, 0.0, 0.0], 0.025).unwrap();

    assert_eq!(forces.len(), 3);
    assert_eq!(system.engine().n_steps(), 3);
    assert_relative_eq!(system.time(), 0.025, epsilon = 1e-12);
    assert_relative_eq!(system.connections()[1].position().x, 30.025, epsilon = 1e-12);
}

#[test]
fn bad_step_input_changes_nothing() {
    let mut system = level_line();
    let before = system.serialize();

    for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
        let err = system.step(&FAIRLEAD, &[0.0; 3], dt).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
    let err = system.step(&FAIRLEAD[..2], &[0.0; 2], 0.01).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    assert_eq!(system.serialize(), before);
}

#[test]
fn free_connection_falls_under_gravity() {
    let text = r#"
        scheme = "rk4"
        dt_m = "0.01 s"

        [[connections]]
        id = 1
        role = "free"
        position = [0.0, 0.0, -10.0]
        mass = 100.0
    "#;
    let mut system = MooringSystem::from_toml(text).unwrap();
    assert_eq!(system.total_coupled_dof(), 0);
    system.init(&[], &[], true).unwrap();

    let forces = system.step(&[], &[], 0.1).unwrap();

    assert!(forces.is_empty());
    let z = system.connections()[0].position().z;
    assert_relative_eq!(z, -10.0 - 0.5 * 9.81 * 0.01, epsilon = 1e-10);
    assert_relative_eq!(system.connections()[0].velocity().z, -0.981, epsilon = 1e-10);
}

#[test]
fn failure_detaches_onto_a_new_free_connection() {
    let mut system = MooringSystem::from_toml(&with_failure(0.015)).unwrap();
    system.init(&FAIRLEAD, &[0.0; 3], true).unwrap();

    system.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    assert_eq!(system.connections().len(), 2);

    system.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    let connections = system.connections();
    assert_eq!(connections.len(), 3);
    assert!(connections[0].attached().is_empty());
    assert_eq!(connections[2].role(), Role::Free);
    assert_eq!(connections[2].position(), system.lines()[0].end_position(End::A));
    assert_eq!(system.total_free_dof(), 18);

    // The detached end is now integrated with the rest of the state.
    system.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    assert!(system.connections()[2].position().z < -50.0);
}

#[test]
fn one_end_cannot_be_listed_by_two_failures() {
    let text = format!("{}\n[[failures]]\nconnection = 1\nlines = [1]\n", with_failure(0.5));
    let err = MooringSystem::from_toml(&text).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn both_ends_can_detach_in_the_same_step() {
    let fairlead = "\n[[failures]]\nconnection = 2\nlines = [1]\ntime = 0.0\n";
    let text = format!("{}{fairlead}", with_failure(0.0));
    let mut system = MooringSystem::from_toml(&text).unwrap();
    system.init(&FAIRLEAD, &[0.0; 3], true).unwrap();

    let forces = system.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();

    let connections = system.connections();
    assert_eq!(connections.len(), 4);
    assert!(connections[0].attached().is_empty());
    assert!(connections[1].attached().is_empty());
    assert_eq!(system.total_free_dof(), 24);
    assert_eq!(forces, vec![0.0; 3]);

    // The line now falls freely, and the system keeps stepping.
    system.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    assert!(system.connections()[3].position().z < -50.0);
}

#[test]
fn external_kinematics_move_the_fairlead_in_place() {
    let mut system = level_line();
    let before = system.serialize();

    let err = system.set_external_kinematics(&[31.0], &[0.0]).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(system.serialize(), before);

    let moved = Vector3::new(31.0, 0.0, -50.0);
    system.set_external_kinematics(moved.as_slice(), &[0.0; 3]).unwrap();

    assert_eq!(system.time(), 0.0);
    assert_eq!(system.engine().n_steps(), 0);
    assert_eq!(system.connections()[1].position(), moved);
    assert_eq!(system.lines()[0].end_position(End::B), moved);

    // The last segment is stretched by a tenth of its length.
    let forces = system.net_forces();
    assert_relative_eq!(forces[0], -0.1 * 1.0e6, max_relative = 1e-9);
}

#[test]
fn settling_sags_the_line_without_advancing_the_clock() {
    let text = format!("{}\n[initial_conditions]\nmax_time = \"2 s\"\n", with_failure(0.0));
    let mut system = MooringSystem::from_toml(&text).unwrap();

    system.init(&FAIRLEAD, &[0.0; 3], false).unwrap();

    assert_eq!(system.time(), 0.0);
    assert_eq!(system.engine().n_steps(), 0);
    assert_eq!(system.connections().len(), 2, "failures trip only once running");
    assert!(system.lines()[0].nodes()[1].z < -50.0);
    assert_eq!(system.lines()[0].end_position(End::B), Vector3::from(FAIRLEAD));

    system.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    assert_eq!(system.connections().len(), 3);
}

#[test]
fn checkpoint_restores_into_a_fresh_system() {
    let mut original = level_line();
    original.step(&FAIRLEAD, &[0.5, 0.0, 0.0], 0.03).unwrap();

    let mut words = original.serialize();
    words.extend([7, 8]);

    let mut restored = level_line();
    let rest = restored.deserialize(&words).unwrap();

    assert_eq!(rest, &[7, 8]);
    assert_eq!(restored.time(), original.time());
    assert_eq!(restored.state(), original.state());
    assert_eq!(restored.serialize(), original.serialize());
    assert_eq!(restored.net_forces(), original.net_forces());
}

#[test]
fn checkpoint_replays_detachments() {
    let text = with_failure(0.0);
    let mut original = MooringSystem::from_toml(&text).unwrap();
    original.init(&FAIRLEAD, &[0.0; 3], true).unwrap();
    original.step(&FAIRLEAD, &[0.0; 3], 0.02).unwrap();
    assert_eq!(original.connections().len(), 3);

    let words = original.serialize();
    let mut restored = MooringSystem::from_toml(&text).unwrap();
    restored.init(&FAIRLEAD, &[0.0; 3], true).unwrap();
    restored.deserialize(&words).unwrap();

    assert_eq!(restored.connections().len(), 3);
    assert_eq!(restored.total_free_dof(), 18);
    assert_eq!(restored.serialize(), words);

    // Both continue identically.
    let a = original.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    let b = restored.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    assert_eq!(a, b);
    assert_eq!(restored.state(), original.state());
}

#[test]
fn checkpoint_cannot_undo_a_detachment() {
    let text = with_failure(0.0);
    let mut fresh = MooringSystem::from_toml(&text).unwrap();
    fresh.init(&FAIRLEAD, &[0.0; 3], true).unwrap();
    let words = fresh.serialize();

    let mut tripped = fresh.clone();
    tripped.step(&FAIRLEAD, &[0.0; 3], 0.01).unwrap();
    let before = tripped.serialize();

    let err = tripped.deserialize(&words).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(tripped.serialize(), before);
}

#[test]
fn truncated_checkpoint_is_rejected() {
    let mut system = level_line();
    let words = system.serialize();
    let before = system.serialize();

    assert!(system.deserialize(&words[..words.len() - 1]).is_err());
    assert_eq!(system.serialize(), before);
}

#[test]
fn wave_buffer_covers_every_line_node() {
    let mut system = level_line();
    system.init_wave_buffer();

    let points = system.wave_points();
    assert_eq!(points.len(), 4);
    assert_eq!(system.waves().point_count(), 4);
    assert_eq!(points[0], Vector3::new(0.0, 0.0, -50.0));
    assert_relative_eq!(points[2].x, 20.0, epsilon = 1e-12);

    let short = vec![Vector3::zeros(); 3];
    let err = system.set_wave_sample(&short, &short, 0.0).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let current = vec![Vector3::new(0.5, 0.0, 0.0); 4];
    system.set_wave_sample(&current, &vec![Vector3::zeros(); 4], 0.0).unwrap();
    assert_eq!(system.waves().current().velocity, current);
}

#[test]
fn systems_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<MooringSystem>();

    let system = level_line();
    let handle = std::thread::spawn(move || system.total_free_dof());
    assert_eq!(handle.join().unwrap(), 12);
}
