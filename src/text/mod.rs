// Text normalization: link/hashtag stripping, lemmatization, stop-words.

pub mod lemmatize;
pub mod normalize;
pub mod stopwords;
