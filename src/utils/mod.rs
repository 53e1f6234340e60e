pub mod error;
pub mod immutable;
pub mod logger;
pub mod validation;
