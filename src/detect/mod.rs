pub mod artifacts;
pub mod detector;
pub mod rules;
