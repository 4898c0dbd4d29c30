use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use super::error::TemplateError;

/// A MiniJinja environment holding the embedded function templates.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();

        // Fail on undefined variables rather than rendering blanks into manifests
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        Self { env }
    }

    /// Register a set of `(name, source)` templates.
    pub fn add_templates(
        &mut self,
        templates: &[(&'static str, &'static str)],
    ) -> Result<(), TemplateError> {
        for &(name, source) in templates {
            self.env
                .add_template(name, source)
                .map_err(|error| TemplateError::from_minijinja_error(error, name, source))?;
        }
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Render a registered template with the given context
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, TemplateError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|error| TemplateError::from_minijinja_error(error, name, ""))?;

        template
            .render(context)
            .map_err(|error| TemplateError::from_minijinja_error(error, name, template.source()))
    }
}
