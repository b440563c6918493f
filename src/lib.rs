//! In-memory catalog of labeled data samples.
//!
//! Samples pair a payload with [`Meta`]data; a [`Corpus`] keeps them in order,
//! tallies every metadata field and derives sub-corpora with [`Corpus::filter`].
//!
//! ```
//! use sample_corpus::{Corpus, Criteria, Meta, SampleBase};
//!
//! let mut corpus = Corpus::new();
//! corpus.add_sample(SampleBase::new(0.99, Meta::new().with("speaker", "alice").with("sex", "female")));
//! corpus.add_sample(SampleBase::new(1.02, Meta::new().with("speaker", "bob").with("sex", "male")));
//!
//! let male = corpus.filter(&Criteria::new().exact("sex", "male")).unwrap();
//! assert_eq!(male.len(), 1);
//! ```

pub mod audio;
pub mod data;
pub mod error;

pub use audio::{
    AudioData, AudioSample, AudioSink, PlaybackOptions, PlotOptions, SpectrogramPanel,
    SpectrogramRenderer,
};
pub use data::corpus::{Corpus, FrequencyIndex};
pub use data::filter::{Criteria, Criterion};
pub use data::loader::{load_audio_corpus, load_corpus, LoadOptions};
pub use data::model::{Meta, MetaValue};
pub use data::sample::{Sample, SampleBase};
pub use error::{CorpusError, CorpusResult};
