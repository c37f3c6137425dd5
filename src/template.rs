//! Template engine for templated databases.
//!
//! Uses Handlebars. Variables are exposed as top-level context fields
//! holding their raw JSON text, functions as zero-argument helpers:
//!
//! ```text
//! {"urls": {"/user": {"json": {"name": {{name}}, "id": {{id}}, "tags": {{call "tags"}}}}}}
//! ```

use crate::error::LoadError;
use crate::params::{Functions, TemplateParams};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
};
use std::sync::Arc;
use tracing::warn;

const TEMPLATE_NAME: &str = "database";

/// Name of the built-in helper calling a function by name.
const CALL_HELPER: &str = "call";

/// Template engine rendering a database body against one set of parameters.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create an engine with the given functions registered as helpers.
    pub fn new(functions: &Functions) -> Self {
        let mut handlebars = Handlebars::new();

        // Unknown variables and functions are errors, not empty output
        handlebars.set_strict_mode(true);

        // Don't escape HTML, the output is JSON
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, producer) in functions {
            let producer = Arc::clone(producer);
            handlebars.register_helper(
                name,
                Box::new(
                    move |_: &Helper,
                          _: &Handlebars,
                          _: &Context,
                          _: &mut RenderContext,
                          out: &mut dyn Output|
                          -> HelperResult {
                        let value = producer()
                            .map_err(|e| RenderErrorReason::Other(e.to_string()))?;
                        out.write(&value)?;
                        Ok(())
                    },
                ),
            );
        }

        // A user function named `call` takes precedence over the built-in
        if functions.contains_key(CALL_HELPER) {
            warn!(
                function = CALL_HELPER,
                "Function shadows the built-in call helper"
            );
            return Self { handlebars };
        }

        let registry = Arc::new(functions.clone());
        handlebars.register_helper(
            CALL_HELPER,
            Box::new(
                move |h: &Helper,
                      _: &Handlebars,
                      _: &Context,
                      _: &mut RenderContext,
                      out: &mut dyn Output|
                      -> HelperResult {
                    let name = h
                        .param(0)
                        .and_then(|v| v.value().as_str())
                        .ok_or_else(|| {
                            RenderErrorReason::Other("call expects a function name".to_string())
                        })?;
                    let producer = registry.get(name).ok_or_else(|| {
                        RenderErrorReason::Other(format!("function not defined: {}", name))
                    })?;
                    let value = producer().map_err(|e| RenderErrorReason::Other(e.to_string()))?;
                    out.write(&value)?;
                    Ok(())
                },
            ),
        );

        Self { handlebars }
    }

    /// Render `template` with the variables and functions in `params`.
    ///
    /// The output is not checked for JSON validity.
    pub fn render(template: &str, params: &TemplateParams) -> Result<String, LoadError> {
        let mut engine = Self::new(&params.functions);
        engine
            .handlebars
            .register_template_string(TEMPLATE_NAME, template)?;
        Ok(engine.handlebars.render(TEMPLATE_NAME, &params.variables)?)
    }
}
