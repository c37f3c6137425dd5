//! Template parameters: the declarative block after the `---` delimiter.
//!
//! ```json
//! {
//!   "variables": {"greeting": "hello", "limits": [1, 2]},
//!   "functions": {
//!     "rand":  {"id": {"type": "int", "min": 1, "max": 100}},
//!     "array": {"tags": {"type": "string", "arraysize": 3, "size": 8}}
//!   }
//! }
//! ```

use crate::generator::{make_array, make_scalar, ArraySpec, Producer, RandomSource, ScalarSpec};
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Registry of named producers exposed to templates.
pub type Functions = BTreeMap<String, Producer>;

/// Generator declarations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionParams {
    /// Scalar generators
    pub rand: HashMap<String, ScalarSpec>,
    /// Array generators
    pub array: HashMap<String, ArraySpec>,
}

impl FunctionParams {
    /// Build the function registry.
    ///
    /// `rand` entries are registered before `array` entries, so an array
    /// generator replaces a scalar one of the same name. Entries whose
    /// constraints select no mode are left out.
    pub fn parse(&self, rng: &RandomSource) -> Functions {
        let mut functions = Functions::new();

        for (name, spec) in &self.rand {
            match make_scalar(spec, rng) {
                Some(producer) => {
                    functions.insert(name.clone(), producer);
                }
                None => debug!(name = %name, kind = %spec.kind, "Skipping rand generator"),
            }
        }

        for (name, spec) in &self.array {
            match make_array(spec, rng) {
                Some(producer) => {
                    functions.insert(name.clone(), producer);
                }
                None => debug!(name = %name, kind = %spec.kind, "Skipping array generator"),
            }
        }

        functions
    }
}

/// Parameter block of a templated database.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Raw JSON fragments substituted verbatim
    pub variables: HashMap<String, Box<RawValue>>,
    /// Generator declarations
    pub functions: Option<FunctionParams>,
}

impl Parameters {
    /// Parse a parameter block.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build the variable and function registries for one render.
    pub fn parse(&self, rng: &RandomSource) -> TemplateParams {
        let variables = self
            .variables
            .iter()
            .map(|(name, raw)| (name.clone(), raw.get().to_string()))
            .collect();
        let functions = self
            .functions
            .as_ref()
            .map(|functions| functions.parse(rng))
            .unwrap_or_default();

        TemplateParams {
            variables,
            functions,
        }
    }
}

/// Registries handed to the template engine.
#[derive(Default)]
pub struct TemplateParams {
    /// Variable name to raw JSON text
    pub variables: BTreeMap<String, String>,
    /// Function name to producer
    pub functions: Functions,
}

impl std::fmt::Debug for TemplateParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateParams")
            .field("variables", &self.variables)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}
