pub mod connectivity;
pub mod counters;
pub mod estimator;
