//! Database loading.
//!
//! A database file is either plain JSON:
//!
//! ```json
//! {"urls": {"/test": {"json": {"field1": "value1"}}}}
//! ```
//!
//! or a template body and a parameter block separated by `---`:
//!
//! ```text
//! {"urls": {"/test": {"json": {"id": {{id}}, "name": {{name}}}}}}
//! ---
//! {"variables": {"name": "Ada"}, "functions": {"rand": {"id": {"type": "int", "min": 1, "max": 100}}}}
//! ```
//!
//! Both load into a [`RouteTable`]. The legacy `URLs` / `JSON` key casing is
//! accepted as well.

use crate::error::{LoadError, ParseStage};
use crate::generator::RandomSource;
use crate::params::Parameters;
use crate::template::TemplateEngine;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Separator between template body and parameter block.
pub const DELIMITER: &str = "---";

/// Payload served for a route that has no `json` entry.
const NULL_PAYLOAD: &[u8] = b"null";

/// Mapping of request path to raw JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: HashMap<String, Vec<u8>>,
}

impl RouteTable {
    /// Look up the payload for an exact, case-sensitive path.
    pub fn lookup(&self, path: &str) -> Option<&[u8]> {
        self.routes.get(path).map(Vec::as_slice)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    fn from_json(text: &[u8], stage: ParseStage) -> Result<Self, LoadError> {
        let document: RouteDocument =
            serde_json::from_slice(text).map_err(|e| LoadError::parse(stage, e))?;

        let routes = document
            .urls
            .into_iter()
            .map(|(path, entry)| {
                let payload = entry
                    .json
                    .map(|raw| raw.get().as_bytes().to_vec())
                    .unwrap_or_else(|| NULL_PAYLOAD.to_vec());
                (path, payload)
            })
            .collect();

        Ok(Self { routes })
    }
}

#[derive(Deserialize)]
struct RouteDocument {
    #[serde(default, alias = "URLs")]
    urls: HashMap<String, RouteEntry>,
}

#[derive(Deserialize)]
struct RouteEntry {
    #[serde(default, alias = "JSON")]
    json: Option<Box<RawValue>>,
}

/// Shape of a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Directly parsable JSON
    Plain,
    /// Template body and parameter block
    Templated,
}

impl DocumentKind {
    /// Templated when the content contains the delimiter anywhere.
    pub fn detect(content: &[u8]) -> Self {
        if content
            .windows(DELIMITER.len())
            .any(|w| w == DELIMITER.as_bytes())
        {
            DocumentKind::Templated
        } else {
            DocumentKind::Plain
        }
    }
}

/// A templated database split at its first delimiter.
#[derive(Debug)]
pub struct TemplateDocument<'a> {
    /// Template body
    pub body: &'a str,
    /// Parsed parameter block
    pub parameters: Parameters,
}

impl<'a> TemplateDocument<'a> {
    /// Split `content` at the first delimiter and parse the parameter block.
    ///
    /// Content without a delimiter is treated as a body with no parameters.
    pub fn split(content: &'a str) -> Result<Self, LoadError> {
        let (body, parameters) = match content.split_once(DELIMITER) {
            Some((body, tail)) => (
                body,
                Parameters::from_json(tail)
                    .map_err(|e| LoadError::parse(ParseStage::Parameters, e))?,
            ),
            None => (content, Parameters::default()),
        };
        Ok(Self { body, parameters })
    }

    /// Render the body and parse the result into a route table.
    ///
    /// Producers draw from a source forked off `rng`, so every render gets
    /// its own generator state.
    pub fn render(&self, rng: &RandomSource) -> Result<RouteTable, LoadError> {
        let params = self.parameters.parse(&rng.fork());
        debug!(
            variables = params.variables.len(),
            functions = params.functions.len(),
            "Rendering templated database"
        );
        let rendered = TemplateEngine::render(self.body, &params)?;
        RouteTable::from_json(rendered.as_bytes(), ParseStage::Rendered)
    }
}

/// Load a database file into a route table.
pub fn load(path: impl AsRef<Path>, rng: &RandomSource) -> Result<RouteTable, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse(&content, rng)?;
    debug!(path = %path.display(), routes = table.len(), "Database loaded");
    Ok(table)
}

/// Build a route table from the raw content of a database file.
pub fn parse(content: &[u8], rng: &RandomSource) -> Result<RouteTable, LoadError> {
    match DocumentKind::detect(content) {
        DocumentKind::Plain => RouteTable::from_json(content, ParseStage::Document),
        DocumentKind::Templated => {
            let text = std::str::from_utf8(content)?;
            TemplateDocument::split(text)?.render(rng)
        }
    }
}
