use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::filter::Criteria;
use crate::error::{CorpusError, CorpusResult};

// ---------------------------------------------------------------------------
// MetaValue – a single metadata scalar
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata scalar.
/// The frequency index keys on it through `BTreeMap`, so `MetaValue` must be `Ord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

// -- Manual Eq/Ord so MetaValue can key BTreeMap / BTreeSet --
//
// Integers and floats form one numeric kind compared by value: `Integer(37)`
// equals `Float(37.0)`, ranks as it and hashes as it. Floats order by
// `total_cmp` with -0.0 folded into 0.0, so NaN == NaN.

impl PartialEq for MetaValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for MetaValue {}

impl PartialOrd for MetaValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetaValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetaValue::*;
        fn discriminant(v: &MetaValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                String(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => fold_zero(*a).total_cmp(&fold_zero(*b)),
            (Integer(a), Float(b)) => cmp_int_float(*a, *b),
            (Float(a), Integer(b)) => cmp_int_float(*b, *a).reverse(),
            (String(a), String(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

fn fold_zero(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else {
        f
    }
}

/// Exact comparison of an integer with a float (no rounding of large integers).
fn cmp_int_float(i: i64, f: f64) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    // 2^63: first float above every i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        // total_cmp places -NaN below and +NaN above every number.
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if f > whole => Ordering::Less,
        Ordering::Equal if f < whole => Ordering::Greater,
        ord => ord,
    }
}

/// The integer an integral, in-range float stands for.
fn integral(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && f >= -LIMIT && f < LIMIT).then(|| f as i64)
}

impl std::hash::Hash for MetaValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            MetaValue::Null => 0u8.hash(state),
            MetaValue::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            MetaValue::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            MetaValue::Float(f) => match integral(*f) {
                Some(i) => {
                    2u8.hash(state);
                    i.hash(state);
                }
                None => {
                    3u8.hash(state);
                    f.to_bits().hash(state);
                }
            },
            MetaValue::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::String(s) => write!(f, "{s}"),
            MetaValue::Integer(i) => write!(f, "{i}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetaValue {
    /// Guess the type of a free-form text cell (CSV, command line).
    ///
    /// Empty → `Null`, then integer, float, `true`/`false`, and finally string.
    pub fn parse_guess(s: &str) -> Self {
        if s.is_empty() {
            return MetaValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return MetaValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return MetaValue::Float(f);
        }
        if s == "true" || s == "false" {
            return MetaValue::Bool(s == "true");
        }
        MetaValue::String(s.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Float(v) => Some(*v),
            MetaValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::String(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::String(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Integer(i)
    }
}

impl From<i32> for MetaValue {
    fn from(i: i32) -> Self {
        MetaValue::Integer(i64::from(i))
    }
}

impl From<u32> for MetaValue {
    fn from(i: u32) -> Self {
        MetaValue::Integer(i64::from(i))
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(MetaValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Meta – the metadata attached to one sample
// ---------------------------------------------------------------------------

/// Named scalar descriptors of a sample (speaker, sex, age, ...).
///
/// Fields are dynamic but unique: inserting an existing name replaces its value.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta {
    fields: BTreeMap<String, MetaValue>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Meta::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field, returning the value it replaced.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<MetaValue>,
    ) -> Option<MetaValue> {
        self.fields.insert(field.into(), value.into())
    }

    /// Remove a field while the metadata is still being assembled.
    pub(crate) fn take(&mut self, field: &str) -> Option<MetaValue> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&MetaValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field)?.as_str()
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field)?.as_i64()
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field)?.as_f64()
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field)?.as_bool()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterate `(field, value)` pairs in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every criterion against this metadata.
    ///
    /// Fields absent from `criteria` are unconstrained. A criterion naming a
    /// field this metadata lacks is an error, not a mismatch. Stops at the
    /// first failing criterion.
    pub fn matches(&self, criteria: &Criteria) -> CorpusResult<bool> {
        for (field, criterion) in criteria.iter() {
            let value = self
                .fields
                .get(field)
                .ok_or_else(|| CorpusError::unknown_field(field))?;
            if !criterion.accepts(value) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Owned copy of the field → value mapping.
    pub fn as_map(&self) -> BTreeMap<String, MetaValue> {
        self.fields.clone()
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for Meta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Meta::new();
        for (k, v) in iter {
            meta.insert(k, v);
        }
        meta
    }
}

impl From<BTreeMap<String, MetaValue>> for Meta {
    fn from(fields: BTreeMap<String, MetaValue>) -> Self {
        Meta { fields }
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metadata:")?;
        for (field, value) in &self.fields {
            write!(f, "\n    {field} : {value}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Criterion;

    fn digit_meta() -> Meta {
        Meta::new()
            .with("speaker", "alice")
            .with("sex", "female")
            .with("age", 37)
            .with("number", "one")
    }

    #[test]
    fn fields_are_addressable_and_typed() {
        let meta = digit_meta();
        assert_eq!(meta.len(), 4);
        assert_eq!(meta.get_str("speaker"), Some("alice"));
        assert_eq!(meta.get_i64("age"), Some(37));
        assert_eq!(meta.get_f64("age"), Some(37.0));
        assert_eq!(meta.get_str("age"), None);
        assert!(meta.get("missing").is_none());
    }

    #[test]
    fn insert_replaces_existing_field() {
        let mut meta = digit_meta();
        let old = meta.insert("age", 38);
        assert_eq!(old, Some(MetaValue::Integer(37)));
        assert_eq!(meta.len(), 4);
        assert_eq!(meta.get_i64("age"), Some(38));
    }

    #[test]
    fn empty_criteria_always_match() {
        assert_eq!(digit_meta().matches(&Criteria::new()), Ok(true));
        assert_eq!(Meta::new().matches(&Criteria::new()), Ok(true));
    }

    #[test]
    fn exact_and_one_of_criteria() {
        let meta = digit_meta();
        let exact = Criteria::new().exact("sex", "female").exact("age", 37);
        assert_eq!(meta.matches(&exact), Ok(true));

        let wrong_age = Criteria::new().exact("age", 48);
        assert_eq!(meta.matches(&wrong_age), Ok(false));

        let hit = Criteria::new().one_of("number", ["one", "two"]);
        assert_eq!(meta.matches(&hit), Ok(true));

        let miss = Criteria::new().one_of("number", ["two", "three"]);
        assert_eq!(meta.matches(&miss), Ok(false));
    }

    #[test]
    fn integer_valued_float_equals_integer() {
        let meta = digit_meta();
        let crit = Criteria::new().with("age", Criterion::Exact(MetaValue::Float(37.0)));
        assert_eq!(meta.matches(&crit), Ok(true));

        let float_age = Meta::new().with("age", 48.0);
        let (field, crit) = Criteria::parse_assignment("age=48").unwrap();
        assert_eq!(float_age.matches(&Criteria::new().with(field, crit)), Ok(true));
        assert_eq!(float_age.matches(&Criteria::new().exact("age", 48.5)), Ok(false));
    }

    #[test]
    fn numeric_values_hash_and_order_by_value() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        fn hash_of(v: &MetaValue) -> u64 {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        }

        assert_eq!(MetaValue::Integer(37), MetaValue::Float(37.0));
        assert_eq!(hash_of(&MetaValue::Integer(37)), hash_of(&MetaValue::Float(37.0)));
        assert_eq!(MetaValue::Integer(0), MetaValue::Float(-0.0));
        assert_eq!(MetaValue::Float(0.0), MetaValue::Float(-0.0));
        assert!(MetaValue::Integer(37) < MetaValue::Float(37.5));
        assert!(MetaValue::Float(36.5) < MetaValue::Integer(37));
        assert!(MetaValue::Integer(-3) > MetaValue::Float(-3.5));
        assert!(MetaValue::Integer(i64::MAX) < MetaValue::Float(1e19));
        assert!(MetaValue::Integer(i64::MAX) < MetaValue::Float(f64::NAN));
        assert_eq!(MetaValue::Float(f64::NAN), MetaValue::Float(f64::NAN));
        assert_ne!(MetaValue::Integer(1), MetaValue::Bool(true));
    }

    #[test]
    fn unknown_field_is_an_error() {
        let meta = digit_meta();
        let crit = Criteria::new().exact("gender", "female");
        assert_eq!(
            meta.matches(&crit),
            Err(CorpusError::UnknownField {
                field: "gender".into()
            })
        );
    }

    #[test]
    fn as_map_returns_an_owned_copy() {
        let meta = digit_meta();
        let mut copy = meta.as_map();
        copy.insert("speaker".into(), "mallory".into());
        copy.remove("sex");
        assert_eq!(meta.get_str("speaker"), Some("alice"));
        assert!(meta.contains("sex"));
    }

    #[test]
    fn display_lists_fields() {
        let meta = Meta::new().with("speaker", "bob").with("age", 48);
        assert_eq!(
            meta.to_string(),
            "Metadata:\n    age : 48\n    speaker : bob"
        );
        assert_eq!(format!("{meta:?}"), r#"{"age": Integer(48), "speaker": String("bob")}"#);
    }

    #[test]
    fn deserializes_from_json_object() {
        let meta: Meta =
            serde_json::from_str(r#"{"speaker": "bob", "age": 48, "height": 1.8, "note": null}"#)
                .unwrap();
        assert_eq!(meta.get_i64("age"), Some(48));
        assert_eq!(meta.get_f64("height"), Some(1.8));
        assert_eq!(meta.get("note"), Some(&MetaValue::Null));
        assert_eq!(serde_json::to_string(&Meta::new().with("n", 1)).unwrap(), r#"{"n":1}"#);
    }

    #[test]
    fn parse_guess_types() {
        assert_eq!(MetaValue::parse_guess(""), MetaValue::Null);
        assert_eq!(MetaValue::parse_guess("42"), MetaValue::Integer(42));
        assert_eq!(MetaValue::parse_guess("4.5"), MetaValue::Float(4.5));
        assert_eq!(MetaValue::parse_guess("true"), MetaValue::Bool(true));
        assert_eq!(MetaValue::parse_guess("bob"), MetaValue::from("bob"));
    }

    #[test]
    fn ordering_groups_by_kind() {
        let mut values = vec![
            MetaValue::from("a"),
            MetaValue::Float(0.5),
            MetaValue::Integer(3),
            MetaValue::Null,
            MetaValue::Bool(false),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                MetaValue::Null,
                MetaValue::Bool(false),
                MetaValue::Float(0.5),
                MetaValue::Integer(3),
                MetaValue::from("a"),
            ]
        );
    }
}
