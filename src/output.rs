//! Writing the produced component maps.

pub(crate) mod materialize;
