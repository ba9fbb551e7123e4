pub mod candidates;
pub mod handlers;
pub mod outbox;
pub mod repository;
pub mod submission;
pub mod validation;
