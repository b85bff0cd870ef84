pub mod identity;
pub mod links;
pub mod scheduler;
pub mod smoke;
