pub mod artifacts;
pub mod checker;
pub mod domain;
pub mod pipeline;
pub mod sanitize;
pub mod traits;
