// Statistical building blocks shared by the free energy estimators

pub mod descriptive;
pub mod normality;
pub mod resampling;
