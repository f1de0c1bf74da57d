//! Client-side label selector, used to filter objects read from files.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::ResourceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equals(String),
    NotEquals(String),
    In(BTreeSet<String>),
    NotIn(BTreeSet<String>),
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match &self.operator {
            Operator::Equals(expected) => value == Some(expected),
            Operator::NotEquals(expected) => value != Some(expected),
            Operator::In(values) => value.is_some_and(|v| values.contains(v)),
            Operator::NotIn(values) => value.is_none_or(|v| !values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

/// A conjunction of requirements; the empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    pub fn parse(selector: &str) -> Result<Self, ResourceError> {
        let invalid = |message: String| ResourceError::InvalidSelector {
            selector: selector.to_string(),
            message,
        };

        let mut requirements = Vec::new();
        for term in split_terms(selector).map_err(invalid)? {
            requirements.push(parse_term(&term).map_err(invalid)?);
        }
        Ok(Self { requirements })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .requirements
            .iter()
            .map(|r| match &r.operator {
                Operator::Equals(v) => format!("{}={}", r.key, v),
                Operator::NotEquals(v) => format!("{}!={}", r.key, v),
                Operator::In(vs) => format!("{} in ({})", r.key, join(vs)),
                Operator::NotIn(vs) => format!("{} notin ({})", r.key, join(vs)),
                Operator::Exists => r.key.clone(),
                Operator::DoesNotExist => format!("!{}", r.key),
            })
            .collect();
        f.write_str(&terms.join(","))
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(",")
}

/// Splits on commas outside parentheses.
fn split_terms(selector: &str) -> Result<Vec<String>, String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in selector.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.checked_sub(1).ok_or("unbalanced ')'")?;
                current.push(c);
            }
            ',' if depth == 0 => terms.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err("unbalanced '('".into());
    }
    terms.push(current);

    let terms: Vec<String> = terms.into_iter().map(|t| t.trim().to_string()).collect();
    if terms.len() == 1 && terms[0].is_empty() {
        return Ok(Vec::new());
    }
    if terms.iter().any(String::is_empty) {
        return Err("empty requirement".into());
    }
    Ok(terms)
}

fn parse_term(term: &str) -> Result<Requirement, String> {
    if let Some(key) = term.strip_prefix('!') {
        return requirement(key, Operator::DoesNotExist);
    }
    if let Some((key, value)) = term.split_once("!=") {
        return requirement(key, Operator::NotEquals(value_of(value)?));
    }
    if let Some((key, value)) = term.split_once("==") {
        return requirement(key, Operator::Equals(value_of(value)?));
    }
    if let Some((key, value)) = term.split_once('=') {
        return requirement(key, Operator::Equals(value_of(value)?));
    }

    let mut words = term.splitn(2, char::is_whitespace);
    let key = words.next().unwrap_or_default();
    let rest = words.next().map(str::trim).unwrap_or_default();
    if rest.is_empty() {
        return requirement(key, Operator::Exists);
    }

    let (op, set) = rest
        .split_once(char::is_whitespace)
        .map(|(op, set)| (op, set.trim()))
        .or_else(|| rest.find('(').map(|i| (rest[..i].trim(), &rest[i..])))
        .ok_or_else(|| format!("unable to parse requirement {term:?}"))?;
    let values = set_of(set)?;
    match op {
        "in" => requirement(key, Operator::In(values)),
        "notin" => requirement(key, Operator::NotIn(values)),
        other => Err(format!("unknown operator {other:?}")),
    }
}

fn requirement(key: &str, operator: Operator) -> Result<Requirement, String> {
    let key = key.trim();
    if !valid_key(key) {
        return Err(format!("invalid label key {key:?}"));
    }
    Ok(Requirement {
        key: key.to_string(),
        operator,
    })
}

fn value_of(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() || valid_value(value) {
        Ok(value.to_string())
    } else {
        Err(format!("invalid label value {value:?}"))
    }
}

fn set_of(set: &str) -> Result<BTreeSet<String>, String> {
    let inner = set
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("expected a parenthesized set, found {set:?}"))?;
    inner.split(',').map(value_of).collect()
}

fn valid_key(key: &str) -> bool {
    let name = key.rsplit_once('/').map_or(key, |(_, name)| name);
    !name.is_empty() && key.len() <= 317 && key.chars().all(|c| c.is_ascii_alphanumeric() || "-_./".contains(c))
}

fn valid_value(value: &str) -> bool {
    value.len() <= 63
        && value.chars().all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
        && value.starts_with(|c: char| c.is_ascii_alphanumeric())
        && value.ends_with(|c: char| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_selector_matches_everything() {
        let selector = LabelSelector::parse("").unwrap();
        assert!(selector.is_empty());
        assert!(selector.matches(&labels(&[])));
    }

    #[test]
    fn equality_operators() {
        let selector = LabelSelector::parse("app=web,tier==front,env!=prod").unwrap();
        assert!(selector.matches(&labels(&[("app", "web"), ("tier", "front")])));
        assert!(!selector.matches(&labels(&[("app", "web"), ("tier", "front"), ("env", "prod")])));
        assert!(!selector.matches(&labels(&[("app", "db"), ("tier", "front")])));
    }

    #[test]
    fn set_operators() {
        let selector = LabelSelector::parse("env in (dev, qa),team notin (ops)").unwrap();
        assert_eq!(selector.requirements().len(), 2);
        assert!(selector.matches(&labels(&[("env", "qa")])));
        assert!(!selector.matches(&labels(&[("env", "qa"), ("team", "ops")])));
        assert!(!selector.matches(&labels(&[("env", "prod")])));
    }

    #[test]
    fn existence_operators() {
        let selector = LabelSelector::parse("app,!canary").unwrap();
        assert!(selector.matches(&labels(&[("app", "x")])));
        assert!(!selector.matches(&labels(&[("app", "x"), ("canary", "true")])));
        assert!(!selector.matches(&labels(&[])));
    }

    #[test]
    fn rendering_is_stable() {
        let selector = LabelSelector::parse("env in (qa,dev),!canary").unwrap();
        assert_eq!(selector.to_string(), "env in (dev,qa),!canary");
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        for bad in ["app=web,", "env in (dev", "env within (dev)", "=web", "app=-bad-"] {
            let err = LabelSelector::parse(bad).unwrap_err();
            assert!(matches!(err, ResourceError::InvalidSelector { .. }), "{bad}");
        }
    }
}
