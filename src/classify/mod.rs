//! Classification: logistic regression and the train/predict pipeline.

pub mod logistic;
pub mod pipeline;

pub use logistic::{sigmoid, LogisticRegression};
pub use pipeline::{split_labelled_and_inbox, ModelKind, ModelPipeline, Prediction};
