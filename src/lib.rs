pub mod cli;
pub mod commands;
pub mod error;
pub mod initializers;
pub mod kubectl;
pub mod options;
pub mod settings;
pub mod templating;
pub mod validation;
