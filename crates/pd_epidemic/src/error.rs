use std::fmt;

/// Wiring mistakes detected when a model is assembled. These are fatal:
/// they indicate a broken setup, not an unlucky parameter draw.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    RateDimension { name: &'static str, found: usize },
    EmptyParameter(&'static str),
    IncrementLength { name: &'static str, found: usize, expected: usize },
    InitialSusceptibles(i64),
    OriginOffset(f64),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateDimension { name, found } =>
                write!(f, "{name} has to be 1-dimensional (found dimension {found})"),
            Self::EmptyParameter(name) =>
                write!(f, "{name} must have at least one entry"),
            Self::IncrementLength { name, found, expected } =>
                write!(f, "{name} has dimension {found}, expected {expected} (the dimension of dS)"),
            Self::InitialSusceptibles(s0) =>
                write!(f, "S0 must be at least 1 (got {s0})"),
            Self::OriginOffset(x) =>
                write!(f, "Origin-to-root offset must be finite and non-negative (got {x})"),
        }
    }
}

impl std::error::Error for ConfigurationError {}
