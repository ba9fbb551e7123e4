pub mod handlers;
pub mod pageviews;
