use std::{fmt, str::FromStr};

use hawser_core::Error;
use serde::{Deserialize, Serialize};

/// Highest Adams-Bashforth order with a coefficient table.
pub const MAX_AB_ORDER: usize = 4;

/// Supported time-stepping schemes.
///
/// Schemes are usually selected by name (see [`Scheme::from_name`]), which is
/// also how they deserialize from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scheme {
    /// First-order explicit Euler.
    ///
    /// One derivative evaluation per step: `r ← r + ṙ·dt`.
    Euler,

    /// Second-order Heun predictor-corrector.
    ///
    /// Predicts with the derivative kept from the previous step, evaluates the
    /// derivative at the prediction and corrects with the average of the two.
    /// Costs one evaluation per step once warmed up.
    Heun,

    /// Second-order explicit midpoint Runge-Kutta.
    Rk2,

    /// Classic fourth-order Runge-Kutta.
    Rk4,

    /// Adams-Bashforth multistep scheme of the given order (2 to 4).
    ///
    /// Keeps a rolling history of the last `order` derivatives. Until that
    /// many are available it uses the highest order the history supports, so
    /// the first step is plain Euler.
    AdamsBashforth { order: usize },

    /// Fixed-point implicit Euler family.
    ///
    /// Each of the `iterations` evaluates the derivative at
    /// `r + ṙ·factor·dt`; the step is then committed with the last
    /// derivative. `factor = 1` is backward Euler, `factor = 0.5` the
    /// implicit midpoint rule.
    Implicit { iterations: usize, factor: f64 },
}

impl Scheme {
    /// Creates an Adams-Bashforth scheme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] unless `2 <= order <= 4`.
    pub fn adams_bashforth(order: usize) -> Result<Self, Error> {
        if !(2..=MAX_AB_ORDER).contains(&order) {
            return Err(Error::invalid_configuration(format!(
                "Adams-Bashforth order must be between 2 and {MAX_AB_ORDER}, got {order}"
            )));
        }
        Ok(Self::AdamsBashforth { order })
    }

    /// Creates an implicit scheme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] unless `0 < factor <= 1`.
    pub fn implicit(iterations: usize, factor: f64) -> Result<Self, Error> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(Error::invalid_configuration(format!(
                "implicit blend factor must be in (0, 1], got {factor}"
            )));
        }
        Ok(Self::Implicit { iterations, factor })
    }

    /// Selects a scheme by case-insensitive name.
    ///
    /// Accepted names are `euler`, `heun`, `rk2`, `rk4`, `ab2`, `ab3`, `ab4`,
    /// `beulerN` (backward Euler with `N` iterations), `midpointN`
    /// (implicit midpoint with `N` iterations) and `implicitN(k=factor)` for
    /// any other blend factor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for unknown names and for
    /// iteration counts that are missing or not a non-negative integer.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let lower = name.to_lowercase();
        match lower.as_str() {
            "euler" => return Ok(Self::Euler),
            "heun" => return Ok(Self::Heun),
            "rk2" => return Ok(Self::Rk2),
            "rk4" => return Ok(Self::Rk4),
            "ab2" => return Ok(Self::AdamsBashforth { order: 2 }),
            "ab3" => return Ok(Self::AdamsBashforth { order: 3 }),
            "ab4" => return Ok(Self::AdamsBashforth { order: 4 }),
            _ => {}
        }

        if let Some(count) = lower.strip_prefix("beuler") {
            let iterations = parse_iterations(count, "Backward Euler", name)?;
            return Self::implicit(iterations, 1.0);
        }
        if let Some(count) = lower.strip_prefix("midpoint") {
            let iterations = parse_iterations(count, "Midpoint", name)?;
            return Self::implicit(iterations, 0.5);
        }
        if let Some(rest) = lower.strip_prefix("implicit") {
            let malformed =
                || Error::invalid_configuration(format!("Invalid implicit name format '{name}'"));
            let (count, factor) = rest
                .strip_suffix(')')
                .and_then(|rest| rest.split_once("(k="))
                .ok_or_else(malformed)?;
            let iterations = parse_iterations(count, "implicit", name)?;
            let factor = factor.parse::<f64>().map_err(|_| malformed())?;
            return Self::implicit(iterations, factor);
        }

        Err(Error::invalid_configuration(format!(
            "Unknown time scheme '{name}'"
        )))
    }

    /// Number of state stages and derivative stages the scheme works with.
    #[must_use]
    pub fn stage_counts(&self) -> (usize, usize) {
        match self {
            Scheme::Euler => (1, 1),
            Scheme::Heun => (1, 2),
            Scheme::Rk2 | Scheme::Implicit { .. } => (2, 1),
            Scheme::Rk4 => (3, 4),
            Scheme::AdamsBashforth { order } => (1, *order),
        }
    }

    /// Human readable description, as printed in logs.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Scheme::Euler => "1st order Euler".to_string(),
            Scheme::Heun => "2nd order Heun".to_string(),
            Scheme::Rk2 => "2nd order Runge-Kutta".to_string(),
            Scheme::Rk4 => "4th order Runge-Kutta".to_string(),
            Scheme::AdamsBashforth { order } => {
                let suffix = match order {
                    2 => "nd",
                    3 => "rd",
                    _ => "th",
                };
                format!("{order}{suffix} order Adams-Bashforth")
            }
            Scheme::Implicit { iterations, factor } => {
                format!("k={factor} implicit Euler ({iterations} iterations)")
            }
        }
    }
}

fn parse_iterations(count: &str, family: &str, name: &str) -> Result<usize, Error> {
    let malformed =
        || Error::invalid_configuration(format!("Invalid {family} name format '{name}'"));
    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    count.parse().map_err(|_| malformed())
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<String> for Scheme {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value)
    }
}

impl From<Scheme> for String {
    fn from(scheme: Scheme) -> Self {
        scheme.to_string()
    }
}

/// Writes the configuration name, so every scheme parses back from its
/// display form.
impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Euler => f.write_str("euler"),
            Scheme::Heun => f.write_str("heun"),
            Scheme::Rk2 => f.write_str("rk2"),
            Scheme::Rk4 => f.write_str("rk4"),
            Scheme::AdamsBashforth { order } => write!(f, "ab{order}"),
            Scheme::Implicit { iterations, factor } => {
                if *factor == 1.0 {
                    write!(f, "beuler{iterations}")
                } else if *factor == 0.5 {
                    write!(f, "midpoint{iterations}")
                } else {
                    write!(f, "implicit{iterations}(k={factor})")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(Scheme::from_name("RK4").unwrap(), Scheme::Rk4);
        assert_eq!(Scheme::from_name("Heun").unwrap(), Scheme::Heun);
        assert_eq!(
            Scheme::from_name("AB3").unwrap(),
            Scheme::AdamsBashforth { order: 3 }
        );
    }

    #[test]
    fn implicit_names_carry_iteration_counts() {
        assert_eq!(
            Scheme::from_name("beuler5").unwrap(),
            Scheme::Implicit {
                iterations: 5,
                factor: 1.0
            }
        );
        assert_eq!(
            Scheme::from_name("Midpoint12").unwrap(),
            Scheme::Implicit {
                iterations: 12,
                factor: 0.5
            }
        );
    }

    #[test]
    fn malformed_iteration_counts_fail() {
        let names = [
            "beuler",
            "beulerx",
            "midpoint-2",
            "midpoint+3",
            "beuler99999999999999999999999",
        ];
        for name in names {
            let err = Scheme::from_name(name).unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfiguration(_)),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_names_fail_loudly() {
        let err = Scheme::from_name("leapfrog").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: Unknown time scheme 'leapfrog'"
        );
        assert!(Scheme::from_name("ab5").is_err());
        assert!(Scheme::from_name("").is_err());
    }

    #[test]
    fn display_round_trips_through_from_name() {
        for name in ["euler", "heun", "rk2", "rk4", "ab2", "ab3", "ab4", "beuler3", "midpoint7"] {
            let scheme = Scheme::from_name(name).unwrap();
            assert_eq!(scheme.to_string(), name);
            assert_eq!(name.parse::<Scheme>().unwrap(), scheme);
        }
    }

    #[test]
    fn constructors_validate_parameters() {
        assert!(Scheme::adams_bashforth(1).is_err());
        assert!(Scheme::adams_bashforth(5).is_err());
        assert!(Scheme::implicit(3, 0.0).is_err());
        assert!(Scheme::implicit(3, 1.5).is_err());
        assert!(Scheme::implicit(3, f64::NAN).is_err());
        assert!(Scheme::implicit(3, 0.7).is_ok());
    }

    #[test]
    fn descriptions_match_log_names() {
        assert_eq!(Scheme::Rk4.description(), "4th order Runge-Kutta");
        assert_eq!(
            Scheme::AdamsBashforth { order: 3 }.description(),
            "3rd order Adams-Bashforth"
        );
        assert_eq!(
            Scheme::from_name("midpoint4").unwrap().description(),
            "k=0.5 implicit Euler (4 iterations)"
        );
    }

    #[test]
    fn deserializes_from_a_name() {
        #[derive(Debug, Deserialize)]
        struct Settings {
            scheme: Scheme,
        }

        let settings: Settings = toml::from_str("scheme = \"RK2\"").unwrap();
        assert_eq!(settings.scheme, Scheme::Rk2);

        let err = toml::from_str::<Settings>("scheme = \"verlet\"").unwrap_err();
        assert!(err.to_string().contains("Unknown time scheme 'verlet'"));
    }

    #[test]
    fn serializes_as_its_name() {
        #[derive(Serialize)]
        struct Settings {
            scheme: Scheme,
        }

        let scheme = Scheme::implicit(7, 0.5).unwrap();
        let text = toml::to_string(&Settings { scheme }).unwrap();
        assert_eq!(text.trim(), "scheme = \"midpoint7\"");
    }

    #[test]
    fn any_implicit_factor_survives_a_config_file() {
        #[derive(Debug, Deserialize, Serialize)]
        struct Settings {
            scheme: Scheme,
        }

        let scheme = Scheme::implicit(4, 0.7).unwrap();
        assert_eq!(scheme.to_string(), "implicit4(k=0.7)");

        let text = toml::to_string(&Settings { scheme }).unwrap();
        let settings: Settings = toml::from_str(&text).unwrap();
        assert_eq!(settings.scheme, scheme);
    }

    #[test]
    fn malformed_implicit_factors_fail() {
        let names = [
            "implicit4",
            "implicit4(k=)",
            "implicit(k=0.7)",
            "implicit4(k=0.7",
            "implicit4(k=1.5)",
        ];
        for name in names {
            assert!(Scheme::from_name(name).is_err(), "{name} should be rejected");
        }
    }
}
