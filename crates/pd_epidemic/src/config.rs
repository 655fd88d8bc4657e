use serde::{Serialize, Deserialize};

use crate::RealParameter;
use crate::IntegerParameter;
use crate::ParameterSource;
use crate::SkylineRates;
use crate::BirthDeathSir;
use crate::BirthDeathSirInputs;
use crate::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RateConfig {
    Canonical {
        birth_rate: RealParameter,
        death_rate: RealParameter,
        sampling_rate: RealParameter,
    },
    Epidemiological {
        #[serde(rename = "R0")]
        r0: RealParameter,
        become_uninfectious_rate: RealParameter,
        sampling_proportion: RealParameter,
    },
}

impl RateConfig {
    pub fn as_rates(&self) -> SkylineRates<'_> {
        match self {
            RateConfig::Canonical { birth_rate, death_rate, sampling_rate } =>
                SkylineRates::Canonical { birth_rate, death_rate, sampling_rate },
            RateConfig::Epidemiological { r0, become_uninfectious_rate, sampling_proportion } =>
                SkylineRates::Epidemiological { r0, become_uninfectious_rate, sampling_proportion },
        }
    }
}

fn no_offset() -> RealParameter {
    RealParameter(vec![0.0])
}

/// A complete, self-contained BDSIR setup, e.g. read from JSON:
///
/// ```json
/// {
///   "S0": 1000,
///   "dS": [10, 20, 40, 20],
///   "dR": [0, 5, 30, 40],
///   "origin": 0.5,
///   "rates": { "mode": "epidemiological", "R0": 2.5,
///              "become_uninfectious_rate": 1.0, "sampling_proportion": 0.1 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BdsirConfig {
    #[serde(rename = "S0")]
    pub s0: RealParameter,
    #[serde(rename = "dS")]
    pub ds: IntegerParameter,
    #[serde(rename = "dE", default, skip_serializing_if = "Option::is_none")]
    pub de: Option<IntegerParameter>,
    #[serde(rename = "dR")]
    pub dr: IntegerParameter,
    #[serde(rename = "origin", default = "no_offset")]
    pub origin_to_root: RealParameter,
    pub rates: RateConfig,
}

impl BdsirConfig {
    pub fn inputs(&self) -> BirthDeathSirInputs<'_> {
        BirthDeathSirInputs {
            s0: &self.s0,
            ds: &self.ds,
            de: self.de.as_ref().map(|de| de as &dyn ParameterSource),
            dr: &self.dr,
            origin_to_root: &self.origin_to_root,
            rates: self.rates.as_rates(),
        }
    }

    pub fn model(&self) -> Result<BirthDeathSir<'_>, ConfigurationError> {
        BirthDeathSir::new(self.inputs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pd_tree::Tree;

    const CONFIG: &str = r#"{
        "S0": 1000,
        "dS": [10, 20, 40, 20],
        "dR": [0, 5, 30, 40],
        "origin": 0.5,
        "rates": { "mode": "epidemiological", "R0": 2.5,
                   "become_uninfectious_rate": 1.0, "sampling_proportion": 0.1 }
    }"#;

    #[test]
    fn test_parse_config() {
        let config: BdsirConfig = serde_json::from_str(CONFIG).unwrap();
        assert_eq!(config.s0, RealParameter(vec![1000.0]));
        assert_eq!(config.de, None);
        assert!(matches!(config.rates, RateConfig::Epidemiological { .. }));

        let model = config.model().unwrap();
        assert_eq!(model.rates().birth_rate0(), 2.5);
        assert!((model.rates().death_rate0() - 0.9).abs() < 1e-12);
        assert!((model.rates().sampling_rate0() - 0.1).abs() < 1e-12);
        assert_eq!(model.origin_offset(), 0.5);
        assert_eq!(model.birth_rate_changes(), 3);
    }

    #[test]
    fn test_config_evaluates() {
        let config: BdsirConfig = serde_json::from_str(CONFIG).unwrap();
        let model = config.model().unwrap();
        let tree = Tree::from_newick("((A:1,B:1):1,(C:0.5,D:0.5):1.5);").unwrap();
        let result = model.update_rates_and_times(&tree).unwrap();
        let traj = result.trajectory().unwrap();
        assert_eq!(traj.birth.len(), 4);
        assert_eq!(traj.final_state().total(), 1000);
    }

    #[test]
    fn test_defaults_and_errors() {
        let json = r#"{
            "S0": 10, "dS": [1, 1], "dR": [0, 0, 0],
            "rates": { "mode": "canonical", "birth_rate": 1.0,
                       "death_rate": 0.5, "sampling_rate": 0.1 }
        }"#;
        let config: BdsirConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.origin_to_root, RealParameter(vec![0.0]));
        assert_eq!(
            config.model().err(),
            Some(ConfigurationError::IncrementLength { name: "dR", found: 3, expected: 2 })
        );
    }
}
