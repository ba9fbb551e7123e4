pub mod filters;
pub mod handlers;
pub mod posting;
pub mod store;
