use std::fmt;

use super::model::Meta;

/// Anything a [`Corpus`](super::corpus::Corpus) can catalog: it only needs metadata.
pub trait Sample {
    fn meta(&self) -> &Meta;
}

// ---------------------------------------------------------------------------
// SampleBase – payload + metadata
// ---------------------------------------------------------------------------

/// A data payload paired with its descriptive metadata.
///
/// The payload is opaque to the corpus: a scalar, a vector, a blob.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBase<D> {
    data: D,
    meta: Meta,
}

impl<D> SampleBase<D> {
    pub fn new(data: D, meta: Meta) -> Self {
        Self { data, meta }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Split back into payload and metadata.
    pub fn into_parts(self) -> (D, Meta) {
        (self.data, self.meta)
    }
}

impl<D> Sample for SampleBase<D> {
    fn meta(&self) -> &Meta {
        &self.meta
    }
}

impl<D: fmt::Debug> fmt::Display for SampleBase<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data : {:?}", self.data)?;
        write!(f, "{}", self.meta)
    }
}
