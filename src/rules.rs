//! The rule table: which permissions, safety multipliers, generated names,
//! notes and slope overrides apply to a way, picked by best specifier score.

use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::osm::Tags;
use crate::permission::Permission;
use crate::specifier::Specifier;

/// Safety multipliers for travel along and against a way. 1.0 is neutral,
/// above penalises, below rewards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SafetyFeatures {
    pub forward: f64,
    pub backward: f64,
}

impl SafetyFeatures {
    pub const NEUTRAL: SafetyFeatures = SafetyFeatures {
        forward: 1.0,
        backward: 1.0,
    };

    pub fn new(forward: f64, backward: f64) -> Self {
        SafetyFeatures { forward, backward }
    }

    fn scaled_by(self, other: SafetyFeatures) -> SafetyFeatures {
        SafetyFeatures {
            forward: self.forward * other.forward,
            backward: self.backward * other.backward,
        }
    }
}

impl Default for SafetyFeatures {
    fn default() -> Self {
        SafetyFeatures::NEUTRAL
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WayProperties {
    pub permission: Permission,
    pub safety: SafetyFeatures,
}

impl WayProperties {
    pub fn new(permission: Permission, forward: f64, backward: f64) -> Self {
        WayProperties {
            permission,
            safety: SafetyFeatures::new(forward, backward),
        }
    }

    pub fn with_permission(permission: Permission) -> Self {
        WayProperties {
            permission,
            safety: SafetyFeatures::NEUTRAL,
        }
    }
}

impl Default for WayProperties {
    fn default() -> Self {
        WayProperties::with_permission(Permission::ALL)
    }
}

/// A text pattern whose `{key}` placeholders are filled from tag values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn new(pattern: impl Into<String>) -> Self {
        Template(pattern.into())
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }

    /// Placeholders naming absent tags expand to nothing.
    pub fn expand(&self, tags: &Tags) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    if let Some(value) = tags.get(&after[..close]) {
                        out.push_str(value);
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Properties {
        properties: WayProperties,
        mixin: bool,
    },
    Name(Template),
    Note(Template),
    SlopeOverride(bool),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub specifier: Specifier,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    default_properties: WayProperties,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_permission(mut self, permission: Permission) -> Self {
        self.default_properties = WayProperties::with_permission(permission);
        self
    }

    pub fn default_properties(&self) -> WayProperties {
        self.default_properties
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn add_properties(&mut self, specifier: Specifier, properties: WayProperties, mixin: bool) {
        self.rules.push(Rule {
            specifier,
            outcome: Outcome::Properties { properties, mixin },
        });
    }

    pub fn add_name(&mut self, specifier: Specifier, template: Template) {
        self.rules.push(Rule {
            specifier,
            outcome: Outcome::Name(template),
        });
    }

    pub fn add_note(&mut self, specifier: Specifier, template: Template) {
        self.rules.push(Rule {
            specifier,
            outcome: Outcome::Note(template),
        });
    }

    pub fn add_slope_override(&mut self, specifier: Specifier, value: bool) {
        self.rules.push(Rule {
            specifier,
            outcome: Outcome::SlopeOverride(value),
        });
    }

    /// Highest-scoring outcome accepted by `kind`. Ties keep the rule
    /// registered first; a best score of 0 yields `None`.
    fn best_match<'a>(
        &'a self,
        tags: &Tags,
        kind: impl Fn(&Outcome) -> bool,
    ) -> Option<&'a Outcome> {
        let mut best = None;
        let mut best_score = 0;

        for rule in self.rules.iter().filter(|r| kind(&r.outcome)) {
            let score = rule.specifier.score(tags);
            if score > best_score {
                best = Some(&rule.outcome);
                best_score = score;
            }
        }

        best
    }

    /// Best non-mixin properties (or the default), with the safety of every
    /// matching mixin multiplied in, in registration order.
    pub fn resolve_properties(&self, tags: &Tags) -> WayProperties {
        let best = self.best_match(tags, |o| {
            matches!(o, Outcome::Properties { mixin: false, .. })
        });

        let mut result = match best {
            Some(Outcome::Properties { properties, .. }) => *properties,
            _ => self.default_properties,
        };

        let mut mixed = false;
        for rule in &self.rules {
            if let Outcome::Properties {
                properties,
                mixin: true,
            } = &rule.outcome
            {
                if rule.specifier.score(tags) > 0 {
                    result.safety = result.safety.scaled_by(properties.safety);
                    mixed = true;
                }
            }
        }

        if best.is_none() && !mixed {
            debug!("Used default permissions: {tags}");
        }

        result
    }

    pub fn resolve_creative_name(&self, tags: &Tags) -> Option<String> {
        match self.best_match(tags, |o| matches!(o, Outcome::Name(_))) {
            Some(Outcome::Name(template)) => Some(template.expand(tags)),
            _ => None,
        }
    }

    /// Every note rule that matches at all contributes.
    pub fn resolve_notes(&self, tags: &Tags) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| match &rule.outcome {
                Outcome::Note(template) if rule.specifier.score(tags) > 0 => {
                    Some(template.expand(tags))
                }
                _ => None,
            })
            .unique()
            .collect()
    }

    pub fn resolve_slope_override(&self, tags: &Tags) -> bool {
        match self.best_match(tags, |o| matches!(o, Outcome::SlopeOverride(_))) {
            Some(Outcome::SlopeOverride(value)) => *value,
            _ => false,
        }
    }

    pub fn from_config(config: &RuleConfig) -> Result<Self> {
        let mut table =
            RuleTable::new().with_default_permission(config.default_permission.parse()?);

        for rule in &config.properties {
            let [forward, backward] = rule.safety;
            if forward < 0.0 || backward < 0.0 {
                return Err(BuildError::NegativeSafety {
                    spec: rule.specifier.clone(),
                    value: forward.min(backward),
                });
            }
            table.add_properties(
                rule.specifier.parse()?,
                WayProperties::new(rule.permission.parse()?, forward, backward),
                rule.mixin,
            );
        }
        for rule in &config.names {
            table.add_name(rule.specifier.parse()?, Template::new(&rule.template));
        }
        for rule in &config.notes {
            table.add_note(rule.specifier.parse()?, Template::new(&rule.template));
        }
        for rule in &config.slope_overrides {
            table.add_slope_override(rule.specifier.parse()?, rule.value);
        }

        Ok(table)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RuleConfig = serde_json::from_str(json)?;
        Self::from_config(&config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

fn default_permission_name() -> String {
    "ALL".to_string()
}

fn neutral_safety() -> [f64; 2] {
    [1.0, 1.0]
}

/// Declarative form of a [`RuleTable`], as stored in a JSON rules file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_permission_name")]
    pub default_permission: String,
    #[serde(default)]
    pub properties: Vec<PropertyRuleConfig>,
    #[serde(default)]
    pub names: Vec<TemplateRuleConfig>,
    #[serde(default)]
    pub notes: Vec<TemplateRuleConfig>,
    #[serde(default)]
    pub slope_overrides: Vec<SlopeRuleConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyRuleConfig {
    pub specifier: String,
    pub permission: String,
    #[serde(default = "neutral_safety")]
    pub safety: [f64; 2],
    #[serde(default)]
    pub mixin: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateRuleConfig {
    pub specifier: String,
    pub template: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlopeRuleConfig {
    pub specifier: String,
    pub value: bool,
}
