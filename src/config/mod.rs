//! Lint configuration.
//!
//! A configuration names the rules to run, their severity, their options
//! and the files they skip. It is usually deserialized from a YAML document
//! shaped like:
//!
//! ```yaml
//! rules:
//!   trailing-spaces: enable
//!   indentation:
//!     level: warning
//!     spaces: 2
//!   comments: disable
//! ignore: |
//!   build/
//!   *.generated.yaml
//! ```
//!
//! Every rule id and option is validated against the registry the config is
//! built with; misspellings fail loudly at load time rather than silently
//! linting less than intended.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, YamllintError};
use crate::linter::Level;
use crate::rules::{Rule, RuleOptions, RuleRegistry};

/// Per-rule configuration.
#[derive(Debug)]
pub struct RuleSettings {
    pub level: Level,
    pub options: RuleOptions,
    /// Files this rule alone is skipped for.
    pub ignore: Vec<glob::Pattern>,
}

/// A rule paired with its resolved settings, ready to run on one file.
pub struct ActiveRule<'a> {
    pub rule: &'a dyn Rule,
    pub level: Level,
    pub options: &'a RuleOptions,
}

/// The full lint configuration: registry, enabled rules, ignore patterns.
#[derive(Debug)]
pub struct LintConfig {
    registry: RuleRegistry,
    rules: BTreeMap<String, RuleSettings>,
    ignore: Vec<glob::Pattern>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    rules: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    ignore: Option<serde_yaml::Value>,
    #[serde(default, rename = "ignore-from-file")]
    ignore_from_file: Option<serde_yaml::Value>,
}

impl LintConfig {
    /// An empty configuration: no rules enabled.
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            rules: BTreeMap::new(),
            ignore: Vec::new(),
        }
    }

    /// Every registered rule enabled at error level with default options.
    pub fn with_all_defaults(registry: RuleRegistry) -> Self {
        let rules = registry
            .iter()
            .map(|rule| {
                (
                    rule.id().to_string(),
                    RuleSettings {
                        level: Level::Error,
                        options: RuleOptions::defaults(rule.options()),
                        ignore: Vec::new(),
                    },
                )
            })
            .collect();
        Self {
            registry,
            rules,
            ignore: Vec::new(),
        }
    }

    /// Parse a configuration document and validate it against `registry`.
    pub fn new_from_yaml(conf: &str, registry: RuleRegistry) -> Result<Self> {
        let raw: RawConfig =
            serde_yaml::from_str(conf).map_err(|e| YamllintError::ConfigParse {
                message: e.to_string(),
            })?;

        if raw.ignore.is_some() && raw.ignore_from_file.is_some() {
            return Err(YamllintError::ConflictingIgnore);
        }

        let ignore = match (&raw.ignore, &raw.ignore_from_file) {
            (Some(value), _) => parse_ignore_patterns(value)?,
            (_, Some(value)) => {
                let mut patterns = Vec::new();
                for file in string_or_list(value).ok_or_else(|| YamllintError::ConfigParse {
                    message: "ignore-from-file must be a filename or a list of filenames"
                        .to_string(),
                })? {
                    let content = fs::read_to_string(&file)?;
                    patterns.extend(compile_patterns(content.lines())?);
                }
                patterns
            }
            _ => Vec::new(),
        };

        let mut config = Self {
            registry,
            rules: BTreeMap::new(),
            ignore,
        };
        for (id, value) in &raw.rules {
            config.apply_rule_config(id, value)?;
        }
        debug!(rules = config.rules.len(), "configuration loaded");
        Ok(config)
    }

    fn apply_rule_config(&mut self, id: &str, value: &serde_yaml::Value) -> Result<()> {
        let rule = self
            .registry
            .get(id)
            .ok_or_else(|| YamllintError::UnknownRule { id: id.to_string() })?;
        let specs = rule.options();

        let mut settings = RuleSettings {
            level: Level::Error,
            options: RuleOptions::defaults(specs),
            ignore: Vec::new(),
        };

        match value {
            serde_yaml::Value::String(s) if s == "enable" => {}
            serde_yaml::Value::String(s) if s == "disable" => return Ok(()),
            serde_yaml::Value::Mapping(mapping) => {
                for (key, val) in mapping {
                    let key = key.as_str().ok_or_else(|| YamllintError::ConfigParse {
                        message: format!("non-string option name in rule \"{id}\""),
                    })?;
                    match key {
                        "level" => {
                            let s = val.as_str().unwrap_or_default();
                            settings.level = Level::parse(s).ok_or_else(|| {
                                YamllintError::ConfigParse {
                                    message: format!(
                                        "level of rule \"{id}\" must be \"error\" or \"warning\""
                                    ),
                                }
                            })?;
                        }
                        "ignore" => {
                            settings.ignore = parse_ignore_patterns(val)?;
                        }
                        _ => {
                            let spec = specs
                                .iter()
                                .find(|spec| spec.name == key)
                                .ok_or_else(|| YamllintError::UnknownOption {
                                    rule: id.to_string(),
                                    option: key.to_string(),
                                })?;
                            let coerced = spec.kind.coerce(val).ok_or_else(|| {
                                YamllintError::InvalidOptionValue {
                                    rule: id.to_string(),
                                    option: key.to_string(),
                                    expected: spec.kind.expected(),
                                }
                            })?;
                            settings.options.set(spec.name, coerced);
                        }
                    }
                }
            }
            _ => {
                return Err(YamllintError::ConfigParse {
                    message: format!(
                        "rule \"{id}\" must be \"enable\", \"disable\" or a mapping"
                    ),
                })
            }
        }

        self.rules.insert(id.to_string(), settings);
        Ok(())
    }

    /// Enable a rule with its default options at error level.
    pub fn enable(mut self, id: &str) -> Result<Self> {
        let rule = self
            .registry
            .get(id)
            .ok_or_else(|| YamllintError::UnknownRule { id: id.to_string() })?;
        self.rules.insert(
            id.to_string(),
            RuleSettings {
                level: Level::Error,
                options: RuleOptions::defaults(rule.options()),
                ignore: Vec::new(),
            },
        );
        Ok(self)
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn rule_settings(&self, id: &str) -> Option<&RuleSettings> {
        self.rules.get(id)
    }

    /// Whether the whole file is skipped by the global ignore patterns.
    pub fn is_file_ignored(&self, path: &Path) -> bool {
        matches_any(&self.ignore, path)
    }

    /// The rules to run on one file, per-rule ignores already applied.
    pub fn rules_for(&self, filepath: Option<&Path>) -> Vec<ActiveRule<'_>> {
        self.rules
            .iter()
            .filter(|(_, settings)| {
                filepath.map_or(true, |path| !matches_any(&settings.ignore, path))
            })
            .filter_map(|(id, settings)| {
                self.registry.get(id).map(|rule| ActiveRule {
                    rule,
                    level: settings.level,
                    options: &settings.options,
                })
            })
            .collect()
    }
}

fn matches_any(patterns: &[glob::Pattern], path: &Path) -> bool {
    let text = path.to_string_lossy();
    patterns.iter().any(|p| p.matches(&text))
}

/// `ignore` values: a multi-line string of patterns or a list of strings.
fn parse_ignore_patterns(value: &serde_yaml::Value) -> Result<Vec<glob::Pattern>> {
    let entries = string_or_list(value).ok_or_else(|| YamllintError::ConfigParse {
        message: "ignore must be a string of patterns or a list of patterns".to_string(),
    })?;
    compile_patterns(entries.iter().flat_map(|e| e.lines()))
}

fn string_or_list(value: &serde_yaml::Value) -> Option<Vec<String>> {
    match value {
        serde_yaml::Value::String(s) => Some(vec![s.clone()]),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn compile_patterns<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<glob::Pattern>> {
    let mut patterns = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let pattern =
            glob::Pattern::new(line).map_err(|e| YamllintError::InvalidIgnorePattern {
                pattern: line.to_string(),
                message: e.to_string(),
            })?;
        patterns.push(pattern);
    }
    Ok(patterns)
}
