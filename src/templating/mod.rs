pub mod engine;
pub mod error;

pub use engine::TemplateEngine;
pub use error::TemplateError;
