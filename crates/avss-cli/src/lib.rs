pub mod actions;
pub mod opts;
