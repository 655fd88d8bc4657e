use serde::{Serialize, Deserialize, Deserializer};

/// Read access to a (possibly multi-dimensional) model parameter.
///
/// Models never cache what they read through this trait: every evaluation
/// takes a fresh snapshot, so a host that mutates its parameters between
/// proposals (through interior mutability) is always seen up to date.
pub trait ParameterSource {
    fn dimension(&self) -> usize;

    /// Value of entry `i`. Panics if `i >= dimension()`.
    fn value(&self, i: usize) -> f64;

    /// All entries as integer counts (real values are truncated).
    fn integer_values(&self) -> Vec<i64>;

    fn scalar_value(&self) -> f64 {
        self.value(0)
    }
}

/// Accepts both `3.5` and `[3.5, 1.0]` in configuration files.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(v: OneOrMany<T>) -> Self {
        match v {
            OneOrMany::One(x) => vec![x],
            OneOrMany::Many(xs) => xs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RealParameter(pub Vec<f64>);

impl<'de> Deserialize<'de> for RealParameter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        OneOrMany::<f64>::deserialize(deserializer).map(|v| RealParameter(v.into()))
    }
}

impl From<f64> for RealParameter {
    fn from(x: f64) -> Self {
        RealParameter(vec![x])
    }
}

impl ParameterSource for RealParameter {
    fn dimension(&self) -> usize {
        self.0.len()
    }

    fn value(&self, i: usize) -> f64 {
        self.0[i]
    }

    fn integer_values(&self) -> Vec<i64> {
        self.0.iter().map(|&x| x as i64).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntegerParameter(pub Vec<i64>);

impl<'de> Deserialize<'de> for IntegerParameter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        OneOrMany::<i64>::deserialize(deserializer).map(|v| IntegerParameter(v.into()))
    }
}

impl From<Vec<i64>> for IntegerParameter {
    fn from(xs: Vec<i64>) -> Self {
        IntegerParameter(xs)
    }
}

impl ParameterSource for IntegerParameter {
    fn dimension(&self) -> usize {
        self.0.len()
    }

    fn value(&self, i: usize) -> f64 {
        self.0[i] as f64
    }

    fn integer_values(&self) -> Vec<i64> {
        self.0.clone()
    }
}
