//! Storybook Engine: personalised children's picture books.
//!
//! A child profile picks one of seven themes; the matching template is
//! rendered into an eight-page story whose illustrations arrive one page
//! at a time. A single session state machine tracks the user's journey
//! from landing page through onboarding, generation, preview and order.

pub mod core;
pub mod schema;
