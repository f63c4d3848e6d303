pub mod comparison;
pub mod notifications;
pub mod recommendation;
pub mod survey;
