pub mod dispatcher;
pub mod strategy;
