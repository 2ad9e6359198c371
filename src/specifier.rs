//! Tag predicates and their specificity score.
//!
//! A specifier such as `highway=*;cycleway=lane` matches an entity only if
//! every predicate holds. Each exact match is worth 100 points and each
//! wildcard match 1 point, so exact specificity always dominates.

use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;
use crate::osm::Tags;

const EXACT_MATCH_SCORE: u32 = 100;
const WILDCARD_MATCH_SCORE: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Exact(String),
    Wildcard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Specifier {
    predicates: Vec<(String, Predicate)>,
}

impl Specifier {
    /// The specifier with no predicates. It scores 0 against everything.
    pub fn empty() -> Self {
        Specifier { predicates: vec![] }
    }

    pub fn parse(spec: &str) -> Result<Self, BuildError> {
        let mut predicates = vec![];

        for fragment in spec.split(';').map(str::trim).filter(|f| !f.is_empty()) {
            let Some((key, value)) = fragment.split_once('=') else {
                return Err(BuildError::MalformedSpecifier {
                    spec: spec.to_string(),
                    fragment: fragment.to_string(),
                });
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(BuildError::MalformedSpecifier {
                    spec: spec.to_string(),
                    fragment: fragment.to_string(),
                });
            }

            let predicate = match value.trim() {
                "*" => Predicate::Wildcard,
                exact => Predicate::Exact(exact.to_string()),
            };
            predicates.push((key.to_string(), predicate));
        }

        Ok(Specifier { predicates })
    }

    pub fn predicates(&self) -> &[(String, Predicate)] {
        &self.predicates
    }

    /// Specificity of this specifier against `tags`, or 0 if any predicate
    /// fails.
    pub fn score(&self, tags: &Tags) -> u32 {
        let mut score = 0;

        for (key, predicate) in &self.predicates {
            let Some(actual) = tags.get(key) else {
                return 0;
            };
            match predicate {
                Predicate::Wildcard => score += WILDCARD_MATCH_SCORE,
                Predicate::Exact(expected) if expected == actual => score += EXACT_MATCH_SCORE,
                Predicate::Exact(_) => return 0,
            }
        }

        score
    }
}

impl FromStr for Specifier {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specifier::parse(s)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, predicate)) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            match predicate {
                Predicate::Wildcard => write!(f, "{key}=*")?,
                Predicate::Exact(value) => write!(f, "{key}={value}")?,
            }
        }
        Ok(())
    }
}
