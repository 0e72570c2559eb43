pub mod curriculum;
pub mod mastery;
pub mod recommendation;
pub mod store;
