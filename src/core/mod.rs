pub mod assembler;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod illustration;
pub mod onboarding;
pub mod orders;
pub mod progress;
pub mod reader;
pub mod session;
pub mod template;
