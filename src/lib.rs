pub mod assets;
pub mod config;
pub mod effects;
pub mod matching;
pub mod pose;
