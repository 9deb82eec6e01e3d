// Deterministic identity derivation for cross-run correlation

use crate::model::Parameter;
use uuid::Uuid;

/// Stable identity of a test case definition, independent of the parameter
/// values used in any one invocation. Pure function of `full_name`.
pub fn test_case_id(full_name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, full_name.as_bytes()).to_string()
}

/// Stable identity of one parameterized test instance, used for trend and
/// history analysis across runs.
///
/// Pure function of `full_name` plus the canonical parameter serialization:
/// excluded parameters are removed and the rest are sorted by name then
/// value, so the id does not depend on registration order.
pub fn history_id(full_name: &str, parameters: &[Parameter]) -> String {
    let mut seed = full_name.to_string();
    for (name, value) in canonical_parameters(parameters) {
        seed.push('\n');
        seed.push_str(name);
        seed.push('=');
        seed.push_str(value);
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

fn canonical_parameters(parameters: &[Parameter]) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = parameters
        .iter()
        .filter(|p| !p.excluded)
        .map(|p| (p.name.as_str(), p.value.as_str()))
        .collect();
    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_case_id_deterministic() {
        assert_eq!(
            test_case_id("suite.login works"),
            test_case_id("suite.login works")
        );
    }

    #[test]
    fn test_test_case_id_differs_by_name() {
        assert_ne!(test_case_id("a"), test_case_id("b"));
    }

    #[test]
    fn test_history_id_ignores_parameter_order() {
        let forward = [Parameter::new("a", "1"), Parameter::new("b", "2")];
        let reversed = [Parameter::new("b", "2"), Parameter::new("a", "1")];
        assert_eq!(history_id("t", &forward), history_id("t", &reversed));
    }

    #[test]
    fn test_history_id_varies_with_values() {
        let one = [Parameter::new("n", "1")];
        let two = [Parameter::new("n", "2")];
        assert_ne!(history_id("t", &one), history_id("t", &two));
    }

    #[test]
    fn test_history_id_skips_excluded_parameters() {
        let none: [Parameter; 0] = [];
        let excluded = [Parameter::new("attempt", "3").excluded()];
        assert_eq!(history_id("t", &excluded), history_id("t", &none));
    }

    #[test]
    fn test_history_id_without_parameters_differs_from_test_case_id_domain() {
        // Same seed means same id: a parameterless history id collapses to
        // the test case id by construction.
        assert_eq!(history_id("t", &[]), test_case_id("t"));
    }
}
