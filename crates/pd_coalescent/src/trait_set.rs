use std::fmt;
use ahash::AHashSet;

/// What the values of a trait set mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitKind {
    /// Calendar dates, later samples have larger values.
    DateForward,
    /// Ages before the present, older samples have larger values.
    DateBackward,
    /// Arbitrary labels such as locations.
    Categorical,
}

impl TraitKind {
    pub fn is_temporal(&self) -> bool {
        !matches!(self, TraitKind::Categorical)
    }
}

/// Per-taxon trait values as seen by a tree generator.
pub trait TraitSource {
    fn is_temporal(&self) -> bool;

    fn taxon_count(&self) -> usize;

    fn taxon(&self, i: usize) -> &str;

    /// Sampling height (backward time) of taxon `i`. Only meaningful for
    /// temporal traits.
    fn value_at(&self, i: usize) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraitError {
    NoTaxa,
    InvalidDate { taxon: String, value: String },
    DuplicateTaxon(String),
}

impl fmt::Display for TraitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTaxa => write!(f, "Trait set contains no taxa"),
            Self::InvalidDate { taxon, value } =>
                write!(f, "Invalid date '{value}' for taxon '{taxon}'"),
            Self::DuplicateTaxon(name) => write!(f, "Taxon '{name}' occurs more than once"),
        }
    }
}

impl std::error::Error for TraitError {}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitSet {
    kind: TraitKind,
    taxa: Vec<String>,
    values: Vec<String>,
    heights: Vec<f64>,
}

impl TraitSet {
    /// Build a trait set from `(taxon, value)` pairs. Temporal values are
    /// converted to heights relative to the most recent sample.
    pub fn new<I, S, V>(kind: TraitKind, entries: I) -> Result<Self, TraitError>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<String>,
    {
        let mut taxa = Vec::new();
        let mut values = Vec::new();
        let mut seen = AHashSet::new();
        for (taxon, value) in entries {
            let taxon: String = taxon.into();
            if !seen.insert(taxon.clone()) {
                return Err(TraitError::DuplicateTaxon(taxon));
            }
            taxa.push(taxon);
            values.push(value.into());
        }
        if taxa.is_empty() {
            return Err(TraitError::NoTaxa);
        }

        let heights = if kind.is_temporal() {
            let mut dates = Vec::with_capacity(values.len());
            for (taxon, value) in taxa.iter().zip(&values) {
                match value.trim().parse::<f64>() {
                    Ok(x) if x.is_finite() => dates.push(x),
                    _ => return Err(TraitError::InvalidDate {
                        taxon: taxon.clone(),
                        value: value.clone(),
                    }),
                }
            }
            match kind {
                TraitKind::DateForward => {
                    let newest = dates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    dates.iter().map(|d| newest - d).collect()
                }
                _ => {
                    let newest = dates.iter().cloned().fold(f64::INFINITY, f64::min);
                    dates.iter().map(|d| d - newest).collect()
                }
            }
        } else {
            vec![0.0; taxa.len()]
        };

        Ok(Self { kind, taxa, values, heights })
    }

    /// All taxa sampled at the present.
    pub fn contemporaneous<S: Into<String>>(taxa: impl IntoIterator<Item = S>) -> Result<Self, TraitError> {
        Self::new(TraitKind::DateBackward, taxa.into_iter().map(|t| (t, "0")))
    }

    pub fn kind(&self) -> TraitKind {
        self.kind
    }

    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    /// The value of taxon `i` as given.
    pub fn raw_value(&self, i: usize) -> &str {
        &self.values[i]
    }
}

impl TraitSource for TraitSet {
    fn is_temporal(&self) -> bool {
        self.kind.is_temporal()
    }

    fn taxon_count(&self) -> usize {
        self.taxa.len()
    }

    fn taxon(&self, i: usize) -> &str {
        &self.taxa[i]
    }

    fn value_at(&self, i: usize) -> f64 {
        self.heights[i]
    }
}
