use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Bound, Index, RangeBounds};
use std::sync::Arc;

use log::debug;

use super::filter::Criteria;
use super::model::MetaValue;
use super::sample::Sample;
use crate::error::{CorpusError, CorpusResult};

/// Per-field tally: field → observed value → number of samples carrying it.
pub type FrequencyIndex = BTreeMap<String, BTreeMap<MetaValue, usize>>;

// ---------------------------------------------------------------------------
// Corpus – ordered samples + frequency index
// ---------------------------------------------------------------------------

/// An ordered collection of samples with a running metadata tally.
///
/// Samples are held behind `Arc`: a corpus produced by [`Corpus::filter`]
/// shares them with its source instead of copying. The index always equals
/// the tally of every contained sample's metadata; there is no removal, a
/// smaller corpus is obtained by filtering.
#[derive(Debug)]
pub struct Corpus<S> {
    samples: Vec<Arc<S>>,
    info: FrequencyIndex,
}

impl<S> Default for Corpus<S> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            info: FrequencyIndex::new(),
        }
    }
}

impl<S> Clone for Corpus<S> {
    fn clone(&self) -> Self {
        Self {
            samples: self.samples.clone(),
            info: self.info.clone(),
        }
    }
}

impl<S: Sample> Corpus<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and tally its metadata.
    pub fn add_sample(&mut self, sample: S) {
        self.add_shared(Arc::new(sample));
    }

    /// Append an already shared sample and tally its metadata.
    pub fn add_shared(&mut self, sample: Arc<S>) {
        for (field, value) in sample.meta().fields() {
            *self
                .info
                .entry(field.to_string())
                .or_default()
                .entry(value.clone())
                .or_insert(0) += 1;
        }
        self.samples.push(sample);
    }

    /// Add `sample` only if its metadata satisfies `criteria`.
    ///
    /// Returns whether the sample was added. Fails with
    /// [`CorpusError::UnknownField`] when a criterion names a field the sample
    /// does not carry; nothing is added in that case.
    pub fn add_sample_matching(&mut self, sample: S, criteria: &Criteria) -> CorpusResult<bool> {
        self.add_shared_matching(Arc::new(sample), criteria)
    }

    fn add_shared_matching(&mut self, sample: Arc<S>, criteria: &Criteria) -> CorpusResult<bool> {
        if sample.meta().matches(criteria)? {
            self.add_shared(sample);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Build a new corpus from the samples matching `criteria`, in order.
    ///
    /// The source is left untouched and the result shares its samples.
    pub fn filter(&self, criteria: &Criteria) -> CorpusResult<Corpus<S>> {
        let mut selected = Corpus::new();
        for sample in &self.samples {
            selected.add_shared_matching(Arc::clone(sample), criteria)?;
        }
        debug!(
            "filter kept {} of {} samples ({} criteria)",
            selected.len(),
            self.len(),
            criteria.len()
        );
        Ok(selected)
    }
}

impl<S> Corpus<S> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample at `index`.
    pub fn get(&self, index: usize) -> CorpusResult<&Arc<S>> {
        self.samples.get(index).ok_or(CorpusError::IndexOutOfRange {
            index,
            len: self.samples.len(),
        })
    }

    /// A contiguous run of samples, in corpus order.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> CorpusResult<&[Arc<S>]> {
        let len = self.samples.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        };
        if start > end || end > len {
            return Err(CorpusError::SliceOutOfRange { start, end, len });
        }
        Ok(&self.samples[start..end])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<S>> {
        self.samples.iter()
    }

    /// The frequency index over all samples.
    pub fn info(&self) -> &FrequencyIndex {
        &self.info
    }

    /// Value counts for one metadata field, if any sample carries it.
    pub fn counts(&self, field: &str) -> Option<&BTreeMap<MetaValue, usize>> {
        self.info.get(field)
    }

    /// Names of all metadata fields seen so far.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.info.keys().map(String::as_str)
    }
}

impl<S> Index<usize> for Corpus<S> {
    type Output = S;

    fn index(&self, index: usize) -> &S {
        &self.samples[index]
    }
}

impl<'a, S> IntoIterator for &'a Corpus<S> {
    type Item = &'a Arc<S>;
    type IntoIter = std::slice::Iter<'a, Arc<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl<S: Sample> FromIterator<S> for Corpus<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        corpus.extend(iter);
        corpus
    }
}

impl<S: Sample> Extend<S> for Corpus<S> {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for sample in iter {
            self.add_sample(sample);
        }
    }
}

impl<S> fmt::Display for Corpus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The dataset contains {} samples.", self.len())?;
        for (field, values) in &self.info {
            write!(f, "\n  {field} ({}) :", values.len())?;
            for (value, count) in values {
                write!(f, "\n      * {value} occurs {count} times")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Criterion;
    use crate::data::model::Meta;
    use crate::data::sample::SampleBase;

    type Digit = SampleBase<f64>;

    fn digit(data: f64, speaker: &str, sex: &str, age: i64, number: &str) -> Digit {
        SampleBase::new(
            data,
            Meta::new()
                .with("speaker", speaker)
                .with("sex", sex)
                .with("age", age)
                .with("number", number),
        )
    }

    fn digits() -> Corpus<Digit> {
        vec![
            digit(0.99, "alice", "female", 37, "one"),
            digit(2.1, "alice", "female", 37, "two"),
            digit(1.02, "bob", "male", 48, "one"),
            digit(2.07, "bob", "male", 48, "two"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn preserves_insertion_order() {
        let corpus = digits();
        assert_eq!(corpus.len(), 4);
        let data: Vec<f64> = corpus.iter().map(|s| *s.data()).collect();
        assert_eq!(data, vec![0.99, 2.1, 1.02, 2.07]);
        assert_eq!(*corpus[2].data(), 1.02);
        assert_eq!(*corpus.get(3).unwrap().data(), 2.07);
    }

    #[test]
    fn tallies_every_field() {
        let corpus = digits();
        let sex = corpus.counts("sex").unwrap();
        assert_eq!(sex.get(&"female".into()), Some(&2));
        assert_eq!(sex.get(&"male".into()), Some(&2));
        assert_eq!(corpus.counts("age").unwrap().get(&MetaValue::Integer(48)), Some(&2));
        for field in corpus.fields() {
            let total: usize = corpus.counts(field).unwrap().values().sum();
            assert_eq!(total, corpus.len(), "field {field}");
        }
        assert!(corpus.counts("missing").is_none());
    }

    #[test]
    fn duplicates_are_counted_twice() {
        let mut corpus = Corpus::new();
        let s = digit(1.0, "carol", "female", 29, "three");
        corpus.add_sample(s.clone());
        corpus.add_sample(s);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.counts("speaker").unwrap().get(&"carol".into()), Some(&2));
    }

    #[test]
    fn integral_floats_tally_and_filter_with_integers() {
        let corpus: Corpus<Digit> = vec![
            SampleBase::new(1.0, Meta::new().with("age", 37.0)),
            SampleBase::new(2.0, Meta::new().with("age", 37)),
            SampleBase::new(3.0, Meta::new().with("age", 37.5)),
        ]
        .into_iter()
        .collect();

        let ages = corpus.counts("age").unwrap();
        assert_eq!(ages.len(), 2);
        assert_eq!(ages.get(&MetaValue::Integer(37)), Some(&2));
        assert_eq!(ages.get(&MetaValue::Float(37.5)), Some(&1));

        let (field, crit) = Criteria::parse_assignment("age=37").unwrap();
        let kept = corpus.filter(&Criteria::new().with(field, crit)).unwrap();
        let data: Vec<f64> = kept.iter().map(|s| *s.data()).collect();
        assert_eq!(data, vec![1.0, 2.0]);
    }

    #[test]
    fn filter_keeps_matching_subsequence() {
        let corpus = digits();
        let male = corpus.filter(&Criteria::new().exact("sex", "male")).unwrap();
        assert_eq!(male.len(), 2);
        assert!(male.iter().all(|s| s.meta().get_str("speaker") == Some("bob")));
        assert_eq!(*male[0].data(), 1.02);
        assert_eq!(*male[1].data(), 2.07);
        assert_eq!(male.counts("sex").unwrap().len(), 1);
        assert_eq!(corpus.len(), 4);
    }

    #[test]
    fn filter_with_list_and_exact() {
        let corpus = digits();
        let crit = Criteria::new()
            .one_of("speaker", ["alice", "bob"])
            .exact("number", "two");
        let twos = corpus.filter(&crit).unwrap();
        let data: Vec<f64> = twos.iter().map(|s| *s.data()).collect();
        assert_eq!(data, vec![2.1, 2.07]);
    }

    #[test]
    fn empty_filter_is_identity_and_shares_samples() {
        let corpus = digits();
        let all = corpus.filter(&Criteria::new()).unwrap();
        assert_eq!(all.len(), corpus.len());
        for (a, b) in all.iter().zip(corpus.iter()) {
            assert!(Arc::ptr_eq(a, b));
        }
        assert_eq!(all.info(), corpus.info());
    }

    #[test]
    fn filter_with_unknown_field_fails() {
        let corpus = digits();
        let err = corpus
            .filter(&Criteria::new().exact("accent", "scottish"))
            .unwrap_err();
        assert_eq!(
            err,
            CorpusError::UnknownField {
                field: "accent".into()
            }
        );
    }

    #[test]
    fn add_sample_matching_adds_only_matches() {
        let mut corpus = Corpus::new();
        let crit = Criteria::new().with("age", Criterion::OneOf(vec![48.into()]));
        assert_eq!(
            corpus.add_sample_matching(digit(0.1, "alice", "female", 37, "one"), &crit),
            Ok(false)
        );
        assert_eq!(
            corpus.add_sample_matching(digit(0.2, "bob", "male", 48, "one"), &crit),
            Ok(true)
        );
        assert_eq!(corpus.len(), 1);
        assert!(corpus.counts("speaker").unwrap().get(&"alice".into()).is_none());

        let bad = Criteria::new().exact("dialect", "x");
        assert!(corpus
            .add_sample_matching(digit(0.3, "bob", "male", 48, "two"), &bad)
            .is_err());
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn out_of_range_access() {
        let corpus = digits();
        assert_eq!(
            corpus.get(4).unwrap_err(),
            CorpusError::IndexOutOfRange { index: 4, len: 4 }
        );
        assert_eq!(
            corpus.slice(2..5).unwrap_err(),
            CorpusError::SliceOutOfRange {
                start: 2,
                end: 5,
                len: 4
            }
        );
        assert!(corpus.slice(3..2).is_err());
    }

    #[test]
    fn slices_preserve_order() {
        let corpus = digits();
        let mid = corpus.slice(1..3).unwrap();
        assert_eq!(mid.len(), 2);
        assert_eq!(*mid[0].data(), 2.1);
        assert_eq!(*mid[1].data(), 1.02);
        assert_eq!(corpus.slice(..).unwrap().len(), 4);
        assert_eq!(corpus.slice(4..).unwrap().len(), 0);
        assert_eq!(corpus.slice(..=0).unwrap().len(), 1);
    }

    #[test]
    fn summary_lists_counts() {
        let corpus: Corpus<Digit> = vec![
            SampleBase::new(1.0, Meta::new().with("sex", "female")),
            SampleBase::new(2.0, Meta::new().with("sex", "male")),
            SampleBase::new(3.0, Meta::new().with("sex", "male")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            corpus.to_string(),
            "The dataset contains 3 samples.\n  sex (2) :\n      \
             * female occurs 1 times\n      * male occurs 2 times"
        );
        assert_eq!(
            Corpus::<Digit>::new().to_string(),
            "The dataset contains 0 samples."
        );
    }
}
