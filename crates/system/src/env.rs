use nalgebra::Vector3;
use serde::Deserialize;

/// Environmental constants shared by every object.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Env {
    /// Gravitational acceleration, m/s².
    pub g: f64,

    /// Water density, kg/m³.
    pub rho: f64,

    /// Water depth, m. The seabed lies at `z = -depth`.
    pub depth: f64,

    /// Seabed contact stiffness per unit contact area, Pa/m.
    pub seabed_stiffness: f64,

    /// Seabed contact damping per unit contact area, Pa·s/m.
    pub seabed_damping: f64,

    /// Multiplier on every drag force. Raised only while settling the
    /// initial conditions.
    #[serde(skip, default = "unscaled")]
    pub drag_scale: f64,
}

fn unscaled() -> f64 {
    1.0
}

impl Default for Env {
    fn default() -> Self {
        Self {
            g: 9.81,
            rho: 1025.0,
            depth: 200.0,
            seabed_stiffness: 3.0e6,
            seabed_damping: 3.0e5,
            drag_scale: unscaled(),
        }
    }
}

impl Env {
    /// Net vertical force of gravity and buoyancy on a fully submerged mass.
    #[must_use]
    pub fn net_weight(&self, mass: f64, volume: f64) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, (self.rho * volume - mass) * self.g)
    }

    /// Quadratic drag `½ ρ C A |v| v`, times [`Env::drag_scale`].
    #[must_use]
    pub fn drag(&self, cd_area: f64, velocity: &Vector3<f64>) -> Vector3<f64> {
        0.5 * self.rho * self.drag_scale * cd_area * velocity.norm() * velocity
    }

    /// Seabed reaction on a point touching bottom over `contact_area`.
    #[must_use]
    pub fn seabed_force(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        contact_area: f64,
    ) -> Vector3<f64> {
        let penetration = -self.depth - position.z;
        if penetration <= 0.0 {
            return Vector3::zeros();
        }
        let pressure = self.seabed_stiffness * penetration - self.seabed_damping * velocity.z;
        let fz = contact_area * pressure;
        Vector3::new(0.0, 0.0, fz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn neutrally_buoyant_mass_has_no_net_weight() {
        let env = Env::default();
        assert_relative_eq!(env.net_weight(1025.0, 1.0).z, 0.0);
        assert_relative_eq!(env.net_weight(2.0, 0.0).z, -19.62);
    }

    #[test]
    fn drag_opposes_nothing_at_rest_and_scales_with_the_boost() {
        let mut env = Env::default();
        assert_eq!(env.drag(2.0, &Vector3::zeros()), Vector3::zeros());

        let v = Vector3::new(0.0, -2.0, 0.0);
        assert_relative_eq!(env.drag(2.0, &v).y, -0.5 * 1025.0 * 2.0 * 4.0);

        env.drag_scale = 5.0;
        assert_relative_eq!(env.drag(2.0, &v).y, -5.0 * 0.5 * 1025.0 * 2.0 * 4.0);
    }

    #[test]
    fn drag_boost_is_not_configurable() {
        let env: Env = toml::from_str("depth = 30.0").unwrap();
        assert_relative_eq!(env.drag_scale, 1.0);
        assert!(toml::from_str::<Env>("drag_scale = 2.0").is_err());
    }

    #[test]
    fn seabed_pushes_only_below_bottom() {
        let env = Env {
            depth: 50.0,
            ..Env::default()
        };
        let still = Vector3::zeros();

        assert_eq!(env.seabed_force(&Vector3::new(0.0, 0.0, -49.0), &still, 1.0), Vector3::zeros());

        let force = env.seabed_force(&Vector3::new(0.0, 0.0, -50.1), &still, 2.0);
        assert_relative_eq!(force.z, 2.0 * 3.0e6 * 0.1, epsilon = 1e-6);
    }
}
