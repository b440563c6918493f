use std::collections::BTreeMap;

use anyhow::{bail, Result};

use super::model::MetaValue;

// ---------------------------------------------------------------------------
// Criterion – the constraint placed on one metadata field
// ---------------------------------------------------------------------------

/// Accepted value(s) for a single metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// The field must equal this value.
    Exact(MetaValue),
    /// The field must equal one of these values. An empty list accepts nothing.
    OneOf(Vec<MetaValue>),
}

impl Criterion {
    pub fn accepts(&self, value: &MetaValue) -> bool {
        match self {
            Criterion::Exact(expected) => expected == value,
            Criterion::OneOf(allowed) => allowed.contains(value),
        }
    }
}

impl From<MetaValue> for Criterion {
    fn from(value: MetaValue) -> Self {
        Criterion::Exact(value)
    }
}

impl From<&str> for Criterion {
    fn from(value: &str) -> Self {
        Criterion::Exact(value.into())
    }
}

impl From<Vec<MetaValue>> for Criterion {
    fn from(values: Vec<MetaValue>) -> Self {
        Criterion::OneOf(values)
    }
}

// ---------------------------------------------------------------------------
// Criteria – per-field constraints for match / filter
// ---------------------------------------------------------------------------

/// Field name → constraint. Fields not listed are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    constraints: BTreeMap<String, Criterion>,
}

impl Criteria {
    /// No constraints: every sample matches.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, criterion: Criterion) -> Self {
        self.constraints.insert(field.into(), criterion);
        self
    }

    pub fn exact(self, field: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.with(field, Criterion::Exact(value.into()))
    }

    pub fn one_of<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<MetaValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(field, Criterion::OneOf(values))
    }

    /// Parse a `field=value` or `field=v1,v2,...` assignment.
    ///
    /// A single value yields [`Criterion::Exact`], a comma-separated list
    /// [`Criterion::OneOf`]. Values are type-guessed like CSV cells.
    pub fn parse_assignment(arg: &str) -> Result<(String, Criterion)> {
        let Some((field, values)) = arg.split_once('=') else {
            bail!("Filter '{arg}' is not of the form field=value[,value...]");
        };
        let field = field.trim();
        if field.is_empty() {
            bail!("Filter '{arg}' has an empty field name");
        }
        let mut parsed: Vec<MetaValue> = values
            .split(',')
            .map(|tok| MetaValue::parse_guess(tok.trim()))
            .collect();
        let criterion = if parsed.len() == 1 {
            Criterion::Exact(parsed.remove(0))
        } else {
            Criterion::OneOf(parsed)
        };
        Ok((field.to_string(), criterion))
    }

    pub fn get(&self, field: &str) -> Option<&Criterion> {
        self.constraints.get(field)
    }

    /// Constraints in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.constraints.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Criterion)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, Criterion)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Criteria::new(), |acc, (field, crit)| acc.with(field, crit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_accepts_only_equal_value() {
        let c = Criterion::from("male");
        assert!(c.accepts(&MetaValue::from("male")));
        assert!(!c.accepts(&MetaValue::from("female")));
    }

    #[test]
    fn one_of_is_set_membership() {
        let c = Criterion::OneOf(vec!["one".into(), "two".into()]);
        assert!(c.accepts(&"one".into()));
        assert!(c.accepts(&"two".into()));
        assert!(!c.accepts(&"three".into()));
        assert!(!Criterion::OneOf(vec![]).accepts(&"one".into()));
    }

    #[test]
    fn later_constraint_on_same_field_wins() {
        let crit = Criteria::new().exact("sex", "male").exact("sex", "female");
        assert_eq!(crit.len(), 1);
        assert_eq!(crit.get("sex"), Some(&Criterion::Exact("female".into())));
    }

    #[test]
    fn parse_single_and_list_assignments() {
        let (field, c) = Criteria::parse_assignment("sex=male").unwrap();
        assert_eq!(field, "sex");
        assert_eq!(c, Criterion::Exact("male".into()));

        let (field, c) = Criteria::parse_assignment("age = 37, 48").unwrap();
        assert_eq!(field, "age");
        assert_eq!(
            c,
            Criterion::OneOf(vec![MetaValue::Integer(37), MetaValue::Integer(48)])
        );
    }

    #[test]
    fn parse_rejects_malformed_assignments() {
        assert!(Criteria::parse_assignment("sex").is_err());
        assert!(Criteria::parse_assignment("=male").is_err());
    }

    #[test]
    fn collects_from_pairs() {
        let crit: Criteria = vec![
            ("speaker", Criterion::from("bob")),
            ("number", Criterion::OneOf(vec!["one".into()])),
        ]
        .into_iter()
        .collect();
        let fields: Vec<&str> = crit.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["number", "speaker"]);
    }
}
