pub mod order;
pub mod profile;
pub mod story;
