mod classifier;

pub use classifier::{CLASSIFIER_PROMPT, ImageClassifier, Verdict, parse_verdict};
