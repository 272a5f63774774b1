pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod page;
pub mod reconciler;
pub mod scheduler;
pub mod visibility;
