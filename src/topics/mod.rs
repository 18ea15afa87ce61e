// Topic modeling: bag-of-words corpus, LDA, and visualization data.

pub mod dictionary;
pub mod lda;
pub mod prepare;
