//! Mooring layouts shared by the integration tests.

use hawser_system::MooringSystem;

/// A damped line hanging from an anchor to a coupled fairlead.
pub const CATENARY: &str = r#"
    scheme = "{scheme}"
    dt_m = "{dt_m}"

    [env]
    depth = 100.0

    [[connections]]
    id = 1
    role = "fixed"
    position = [0.0, 0.0, -60.0]

    [[connections]]
    id = 2
    role = "coupled"
    position = [40.0, 0.0, -20.0]

    [[lines]]
    id = 1
    segments = 4
    length = 60.0
    diameter = 0.05
    mass_per_length = 10.0
    ea = 1.0e6
    damping = 1.0e4
    cd = 1.2
    end_a = { connection = 1 }
    end_b = { connection = 2 }
"#;

/// Fairlead kinematics matching [`CATENARY`].
pub const CATENARY_FAIRLEAD: [f64; 3] = [40.0, 0.0, -20.0];

/// A line strung between two coupled fairleads mirrored about `x = 0`.
pub const SYMMETRIC_SPAN: &str = r#"
    scheme = "rk4"
    dt_m = "0.002 s"

    [[connections]]
    id = 1
    role = "coupled"
    position = [-15.0, 0.0, -10.0]

    [[connections]]
    id = 2
    role = "coupled"
    position = [15.0, 0.0, -10.0]

    [[lines]]
    id = 1
    segments = 6
    length = 32.0
    diameter = 0.05
    mass_per_length = 10.0
    ea = 1.0e6
    damping = 1.0e4
    end_a = { connection = 1 }
    end_b = { connection = 2 }
"#;

/// A coupled platform with one fairlead on its hull, moored to an anchor.
pub const PLATFORM: &str = r#"
    dt_m = "0.002 s"

    [[bodies]]
    id = 1
    role = "coupled"
    pose = [0.0, 0.0, -10.0, 0.0, 0.0, 0.0]
    mass = 0.0
    inertia = [0.0, 0.0, 0.0]

    [[connections]]
    id = 1
    role = "fixed"
    position = [20.0, 0.0, -5.0]
    body = 1

    [[connections]]
    id = 2
    role = "fixed"
    position = [300.0, 0.0, -200.0]

    [[lines]]
    id = 1
    segments = 10
    length = 340.0
    diameter = 0.09
    mass_per_length = 77.7
    ea = 3.8e8
    damping = 1.0e6
    end_a = { connection = 2 }
    end_b = { connection = 1 }
"#;

/// Platform pose matching [`PLATFORM`].
pub const PLATFORM_POSE: [f64; 6] = [0.0, 0.0, -10.0, 0.0, 0.0, 0.0];

/// A line across a current, held by two anchors on a horizontal span.
pub const CROSS_CURRENT: &str = r#"
    scheme = "rk2"
    dt_m = "0.001 s"

    [[connections]]
    id = 1
    role = "fixed"
    position = [0.0, 0.0, -50.0]

    [[connections]]
    id = 2
    role = "fixed"
    position = [0.0, 30.0, -50.0]

    [[lines]]
    id = 1
    segments = 3
    length = 30.0
    diameter = 0.1
    mass_per_length = 10.0
    ea = 1.0e6
    damping = 1.0e4
    cd = 1.2
    end_a = { connection = 1 }
    end_b = { connection = 2 }
"#;

/// Fills the `{scheme}` and `{dt_m}` placeholders of a layout.
#[must_use]
pub fn layout(template: &str, scheme: &str, dt_m: &str) -> String {
    template.replace("{scheme}", scheme).replace("{dt_m}", dt_m)
}

/// Builds and initializes a system whose coupled objects sit still at `x`.
/// Lines start straight; settling is skipped.
///
/// # Panics
///
/// Panics if the layout does not build or `x` has the wrong length.
#[must_use]
pub fn at_rest(text: &str, x: &[f64]) -> MooringSystem {
    let mut system = MooringSystem::from_toml(text).expect("layout should build");
    system.init(x, &vec![0.0; x.len()], true).expect("initial kinematics should match");
    system
}

/// Runs `steps` coupling steps of `dt` with the coupled objects held still,
/// returning the last loads.
///
/// # Panics
///
/// Panics if any step fails.
pub fn hold(system: &mut MooringSystem, x: &[f64], dt: f64, steps: usize) -> Vec<f64> {
    let xd = vec![0.0; x.len()];
    let mut forces = Vec::new();
    for _ in 0..steps {
        forces = system.step(x, &xd, dt).expect("coupling step should succeed");
    }
    forces
}
