//! Body persistence

mod body_store;

pub use body_store::BodyStore;
