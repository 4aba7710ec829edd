//! Typed rule options.
//!
//! Each rule declares its options as a static table of [`OptionSpec`]s; the
//! configuration layer validates user-provided values against that table and
//! hands rules a resolved [`RuleOptions`] map with defaults filled in.

use std::collections::BTreeMap;

/// A resolved option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// The shape of values an option accepts.
#[derive(Debug, Clone, Copy)]
pub enum OptionKind {
    Bool,
    Int,
    /// One of a fixed set of keywords.
    Keyword(&'static [&'static str]),
    /// An integer, or one of a fixed set of keywords.
    IntOrKeyword(&'static [&'static str]),
    /// A boolean, or one of a fixed set of keywords.
    BoolOrKeyword(&'static [&'static str]),
}

impl OptionKind {
    /// Human-readable description of what the option accepts, for error
    /// messages.
    pub fn expected(&self) -> String {
        match self {
            OptionKind::Bool => "a boolean".to_string(),
            OptionKind::Int => "an integer".to_string(),
            OptionKind::Keyword(words) => format!("one of {}", words.join(", ")),
            OptionKind::IntOrKeyword(words) => {
                format!("an integer or one of {}", words.join(", "))
            }
            OptionKind::BoolOrKeyword(words) => {
                format!("a boolean or one of {}", words.join(", "))
            }
        }
    }

    /// Coerce a deserialized YAML value into this kind, if it fits.
    pub fn coerce(&self, value: &serde_yaml::Value) -> Option<OptionValue> {
        match (self, value) {
            (OptionKind::Bool, serde_yaml::Value::Bool(b)) => Some(OptionValue::Bool(*b)),
            (OptionKind::Int, serde_yaml::Value::Number(n)) => {
                n.as_i64().map(OptionValue::Int)
            }
            (OptionKind::Keyword(words), serde_yaml::Value::String(s)) => words
                .contains(&s.as_str())
                .then(|| OptionValue::Str(s.clone())),
            (OptionKind::IntOrKeyword(_), serde_yaml::Value::Number(n)) => {
                n.as_i64().map(OptionValue::Int)
            }
            (OptionKind::IntOrKeyword(words), serde_yaml::Value::String(s)) => words
                .contains(&s.as_str())
                .then(|| OptionValue::Str(s.clone())),
            (OptionKind::BoolOrKeyword(_), serde_yaml::Value::Bool(b)) => {
                Some(OptionValue::Bool(*b))
            }
            (OptionKind::BoolOrKeyword(words), serde_yaml::Value::String(s)) => words
                .contains(&s.as_str())
                .then(|| OptionValue::Str(s.clone())),
            _ => None,
        }
    }
}

/// One option a rule accepts, with its default.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: OptionValue,
}

impl OptionSpec {
    pub const fn new(name: &'static str, kind: OptionKind, default: OptionValue) -> Self {
        Self {
            name,
            kind,
            default,
        }
    }
}

/// Resolved options for one rule: user values merged over the defaults.
#[derive(Debug, Clone, Default)]
pub struct RuleOptions {
    values: BTreeMap<&'static str, OptionValue>,
}

impl RuleOptions {
    /// All defaults from a spec table.
    pub fn defaults(specs: &[OptionSpec]) -> Self {
        let values = specs
            .iter()
            .map(|spec| (spec.name, spec.default.clone()))
            .collect();
        Self { values }
    }

    pub fn set(&mut self, name: &'static str, value: OptionValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// The option as a bool. Panics if the rule's spec table does not
    /// declare it as such, which is a programming error.
    pub fn bool(&self, name: &str) -> bool {
        self.get(name)
            .and_then(OptionValue::as_bool)
            .unwrap_or_else(|| panic!("option {name} is not a declared boolean"))
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(OptionValue::as_int)
    }

    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_respects_kind() {
        assert_eq!(
            OptionKind::Bool.coerce(&serde_yaml::Value::Bool(true)),
            Some(OptionValue::Bool(true))
        );
        assert_eq!(OptionKind::Bool.coerce(&serde_yaml::Value::from(3)), None);
        assert_eq!(
            OptionKind::IntOrKeyword(&["consistent"]).coerce(&serde_yaml::Value::from(4)),
            Some(OptionValue::Int(4))
        );
        assert_eq!(
            OptionKind::IntOrKeyword(&["consistent"])
                .coerce(&serde_yaml::Value::from("consistent")),
            Some(OptionValue::Str("consistent".to_string()))
        );
        assert_eq!(
            OptionKind::IntOrKeyword(&["consistent"]).coerce(&serde_yaml::Value::from("bogus")),
            None
        );
    }

    #[test]
    fn defaults_are_applied() {
        let specs = [OptionSpec::new(
            "max",
            OptionKind::Int,
            OptionValue::Int(80),
        )];
        let opts = RuleOptions::defaults(&specs);
        assert_eq!(opts.int("max"), Some(80));
    }

    #[test]
    fn user_values_override_defaults() {
        let specs = [OptionSpec::new(
            "required",
            OptionKind::Bool,
            OptionValue::Bool(true),
        )];
        let mut opts = RuleOptions::defaults(&specs);
        opts.set("required", OptionValue::Bool(false));
        assert!(!opts.bool("required"));
    }
}
