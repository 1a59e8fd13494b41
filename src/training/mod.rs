//! Model training module
//!
//! Binary classifiers behind the [`Classifier`] capability trait:
//! - Logistic regression (L2, L1 or elastic-net penalty)
//! - Stochastic Gradient Descent (SGD)
//! - Decision trees and Random Forests
//!
//! plus stratified splitting, cross-validation and metrics used by [`train`].

pub mod cross_validation;
pub mod decision_tree;
pub mod estimator;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
pub mod sgd;
pub mod split;
mod trainer;

pub use cross_validation::{CVSplit, StratifiedKFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use estimator::{
    build_estimator, extract_importances, predict_with_score, Classifier, EstimatorKind,
    FeatureImportance,
};
pub use linear_models::{LogisticRegression, Penalty};
pub use metrics::{ClassificationMetrics, METRIC_NAMES};
pub use random_forest::{MaxFeatures, RandomForest};
pub use sgd::{LearningRateSchedule, SGDClassifier, SGDConfig, SGDLoss};
pub use split::{stratified_split, TrainTestSplit};
pub use trainer::{train, ModelResult, TestPrediction};
