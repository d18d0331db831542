//! Distribution policies
//!
//! A policy decides how a draw selects a record and what it mutates:
//! `consume` removes the delivered record, `random_repeat` leaves the pool
//! untouched, `round_robin` serves records in order and wraps around.

use serde::{Deserialize, Deserializer};

/// Selection and mutation rule applied on each draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Remove the delivered record from the pool (one-time use).
    Consume,
    /// Random pick, pool unchanged (records reused).
    #[default]
    RandomRepeat,
    /// Cycle through records in order, wrapping at the end.
    RoundRobin,
}

impl Policy {
    /// Parse a policy name.
    ///
    /// Unrecognized names fall back to `RandomRepeat` so a misconfigured
    /// command keeps serving stock instead of failing the request.
    pub fn parse(name: &str) -> Policy {
        match name.trim().to_ascii_lowercase().as_str() {
            "consume" => Policy::Consume,
            "round_robin" => Policy::RoundRobin,
            "random_repeat" => Policy::RandomRepeat,
            _ => Policy::RandomRepeat,
        }
    }

    /// Policy label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Policy::Consume => "consume",
            Policy::RandomRepeat => "random_repeat",
            Policy::RoundRobin => "round_robin",
        }
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Policy::parse(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        assert_eq!(Policy::parse("consume"), Policy::Consume);
        assert_eq!(Policy::parse("random_repeat"), Policy::RandomRepeat);
        assert_eq!(Policy::parse("round_robin"), Policy::RoundRobin);
    }

    #[test]
    fn parse_is_case_and_whitespace_insensitive() {
        assert_eq!(Policy::parse("  Consume "), Policy::Consume);
        assert_eq!(Policy::parse("ROUND_ROBIN"), Policy::RoundRobin);
    }

    #[test]
    fn unknown_names_fall_back_to_random_repeat() {
        assert_eq!(Policy::parse("lottery"), Policy::RandomRepeat);
        assert_eq!(Policy::parse(""), Policy::RandomRepeat);
    }

    #[test]
    fn default_is_random_repeat() {
        assert_eq!(Policy::default(), Policy::RandomRepeat);
    }

    #[test]
    fn labels_round_trip_through_parse() {
        for policy in [Policy::Consume, Policy::RandomRepeat, Policy::RoundRobin] {
            assert_eq!(Policy::parse(policy.label()), policy);
        }
    }

    #[test]
    fn deserializes_from_toml_with_fallback() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            policy: Policy,
        }

        let known: Wrapper = toml::from_str(r#"policy = "consume""#).unwrap();
        assert_eq!(known.policy, Policy::Consume);

        let unknown: Wrapper = toml::from_str(r#"policy = "first_come""#).unwrap();
        assert_eq!(unknown.policy, Policy::RandomRepeat);
    }
}
