//! Random value generators.
//!
//! Turns the declarative `rand` and `array` entries of a templated database
//! into [`Producer`]s. An entry whose constraints select no mode yields no
//! producer at all, so its name stays unregistered.

use crate::error::GeneratorError;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

/// Zero-argument value producer consumed by the template engine.
pub type Producer = Arc<dyn Fn() -> Result<String, GeneratorError> + Send + Sync>;

/// Thread-safe, cloneable handle to a random number generator.
///
/// Clones share the same underlying generator.
#[derive(Clone)]
pub struct RandomSource {
    rng: Arc<Mutex<StdRng>>,
}

impl RandomSource {
    /// Create a non-deterministic source seeded from the OS.
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a deterministic source.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Derive an independent source whose seed is drawn from this one.
    pub fn fork(&self) -> Self {
        Self::seeded(self.with(|rng| rng.gen()))
    }

    fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Uniform integer in `[min, max)`. Requires `max > min`.
    fn int_in(&self, min: i64, max: i64) -> i64 {
        self.with(|rng| rng.gen_range(min..max))
    }

    /// `min + U[0, 1) * (max - min)`.
    fn float_in(&self, min: i64, max: i64) -> f64 {
        let unit: f64 = self.with(|rng| rng.gen());
        min as f64 + unit * (max as f64 - min as f64)
    }

    fn alphanumeric(&self, len: usize) -> String {
        self.with(|rng| {
            (0..len)
                .map(|_| char::from(rng.sample(Alphanumeric)))
                .collect()
        })
    }
}

impl std::fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomSource").finish_non_exhaustive()
    }
}

/// Kind of value a generator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    String,
    Int,
    Float,
}

impl ElementType {
    /// Resolve a `type` tag. Unknown tags resolve to `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(ElementType::String),
            "int" => Some(ElementType::Int),
            "float" => Some(ElementType::Float),
            _ => None,
        }
    }
}

/// Constraint mode selected from a generator's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Draw in `[min, max)`
    Range { min: i64, max: i64 },
    /// Fixed string length
    Size(usize),
}

impl Constraint {
    /// Range mode wins when `max > min`, then size mode when `size > 0`.
    pub fn from_bounds(min: i64, max: i64, size: i64) -> Option<Self> {
        if max > min {
            Some(Constraint::Range { min, max })
        } else if size > 0 {
            usize::try_from(size).ok().map(Constraint::Size)
        } else {
            None
        }
    }
}

/// A single random value (`rand` section entry).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarSpec {
    /// Element type tag: string, int or float
    #[serde(rename = "type")]
    pub kind: String,
    /// Fixed string length
    pub size: i64,
    /// Inclusive lower bound
    pub min: i64,
    /// Exclusive upper bound
    pub max: i64,
}

impl ScalarSpec {
    pub fn element_type(&self) -> Option<ElementType> {
        ElementType::from_tag(&self.kind)
    }

    pub fn constraint(&self) -> Option<Constraint> {
        Constraint::from_bounds(self.min, self.max, self.size)
    }
}

/// A random JSON array (`array` section entry).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArraySpec {
    /// Element type tag: string, int or float
    #[serde(rename = "type")]
    pub kind: String,
    /// Number of elements
    #[serde(rename = "arraysize")]
    pub array_size: i64,
    /// Fixed length of each string element
    pub size: i64,
    /// Inclusive lower bound per element
    pub min: i64,
    /// Exclusive upper bound per element
    pub max: i64,
}

impl ArraySpec {
    pub fn element_type(&self) -> Option<ElementType> {
        ElementType::from_tag(&self.kind)
    }

    pub fn constraint(&self) -> Option<Constraint> {
        Constraint::from_bounds(self.min, self.max, self.size)
    }
}

/// Validated element type and constraint pair.
#[derive(Debug, Clone, Copy)]
enum Element {
    Int { min: i64, max: i64 },
    Float { min: i64, max: i64 },
    /// String whose length is drawn in `[min, max)`
    Text { min: i64, max: i64 },
    /// String of exactly this length
    FixedText(usize),
}

impl Element {
    fn new(kind: ElementType, constraint: Constraint) -> Option<Self> {
        match (kind, constraint) {
            (ElementType::Int, Constraint::Range { min, max }) => Some(Element::Int { min, max }),
            (ElementType::Float, Constraint::Range { min, max }) => {
                Some(Element::Float { min, max })
            }
            (ElementType::String, Constraint::Range { min, max }) if min >= 0 => {
                Some(Element::Text { min, max })
            }
            (ElementType::String, Constraint::Size(size)) => Some(Element::FixedText(size)),
            _ => None,
        }
    }

    fn draw(&self, rng: &RandomSource) -> Value {
        match *self {
            Element::Int { min, max } => Value::from(rng.int_in(min, max)),
            Element::Float { min, max } => Value::from(rng.float_in(min, max)),
            Element::Text { min, max } => Value::from(rng.alphanumeric(text_len(rng, min, max))),
            Element::FixedText(size) => Value::from(rng.alphanumeric(size)),
        }
    }
}

fn producer<F>(f: F) -> Producer
where
    F: Fn() -> Result<String, GeneratorError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Format with six decimals, truncating so the text never reaches `max`.
fn format_micros(value: f64, max: i64) -> String {
    let micros = (value * 1e6).floor().min(max as f64 * 1e6 - 1.0);
    format!("{:.6}", micros / 1e6)
}

fn text_len(rng: &RandomSource, min: i64, max: i64) -> usize {
    usize::try_from(rng.int_in(min, max)).unwrap_or_default()
}

/// Build the producer for a `rand` entry.
///
/// Int values and string range lengths are drawn once, when the producer is
/// built. Floats and string contents are drawn on every call. Returns `None`
/// when the entry selects no mode.
pub fn make_scalar(spec: &ScalarSpec, rng: &RandomSource) -> Option<Producer> {
    let element = Element::new(spec.element_type()?, spec.constraint()?)?;
    let rng = rng.clone();

    let scalar = match element {
        Element::Int { min, max } => {
            let value = rng.int_in(min, max).to_string();
            producer(move || Ok(value.clone()))
        }
        Element::Float { min, max } => {
            producer(move || Ok(format_micros(rng.float_in(min, max), max)))
        }
        Element::Text { min, max } => {
            let len = text_len(&rng, min, max);
            producer(move || Ok(rng.alphanumeric(len)))
        }
        Element::FixedText(size) => producer(move || Ok(rng.alphanumeric(size))),
    };
    Some(scalar)
}

/// Build the producer for an `array` entry.
///
/// Each call yields a JSON array literal of `arraysize` freshly drawn
/// elements. Returns `None` when `arraysize <= 0` or the entry selects no
/// mode.
pub fn make_array(spec: &ArraySpec, rng: &RandomSource) -> Option<Producer> {
    let len = usize::try_from(spec.array_size).ok().filter(|len| *len > 0)?;
    let element = Element::new(spec.element_type()?, spec.constraint()?)?;
    let rng = rng.clone();

    Some(producer(move || {
        let items: Vec<Value> = (0..len).map(|_| element.draw(&rng)).collect();
        Ok(serde_json::to_string(&items)?)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: &str, min: i64, max: i64, size: i64) -> ScalarSpec {
        ScalarSpec {
            kind: kind.to_string(),
            size,
            min,
            max,
        }
    }

    fn array(kind: &str, array_size: i64, min: i64, max: i64, size: i64) -> ArraySpec {
        ArraySpec {
            kind: kind.to_string(),
            array_size,
            size,
            min,
            max,
        }
    }

    #[test]
    fn test_constraint_selection() {
        assert_eq!(
            Constraint::from_bounds(-22, 230, 5),
            Some(Constraint::Range { min: -22, max: 230 })
        );
        assert_eq!(Constraint::from_bounds(0, 0, 20), Some(Constraint::Size(20)));
        assert_eq!(Constraint::from_bounds(5, 5, 0), None);
        assert_eq!(Constraint::from_bounds(10, 2, -1), None);
    }

    #[test]
    fn test_element_type_tags() {
        assert_eq!(ElementType::from_tag("string"), Some(ElementType::String));
        assert_eq!(ElementType::from_tag("int"), Some(ElementType::Int));
        assert_eq!(ElementType::from_tag("float"), Some(ElementType::Float));
        assert_eq!(ElementType::from_tag("bool"), None);
        assert_eq!(ElementType::from_tag(""), None);
    }

    #[test]
    fn test_int_in_half_open_range() {
        let rng = RandomSource::seeded(7);
        for _ in 0..500 {
            let producer = make_scalar(&scalar("int", -22, 230, 0), &rng).unwrap();
            let value: i64 = producer().unwrap().parse().unwrap();
            assert!((-22..230).contains(&value), "{} out of range", value);
        }
    }

    #[test]
    fn test_int_single_value_range() {
        // [4, 5) only admits 4
        let rng = RandomSource::seeded(1);
        for _ in 0..50 {
            let producer = make_scalar(&scalar("int", 4, 5, 0), &rng).unwrap();
            assert_eq!(producer().unwrap(), "4");
        }
    }

    #[test]
    fn test_int_is_fixed_per_producer() {
        let rng = RandomSource::seeded(3);
        let producer = make_scalar(&scalar("int", 0, 1_000_000, 0), &rng).unwrap();
        let first = producer().unwrap();
        for _ in 0..10 {
            assert_eq!(producer().unwrap(), first);
        }
    }

    #[test]
    fn test_float_in_range() {
        let rng = RandomSource::seeded(11);
        let producer = make_scalar(&scalar("float", -22, 230, 0), &rng).unwrap();
        for _ in 0..500 {
            let out = producer().unwrap();
            let value: f64 = out.parse().unwrap();
            assert!(value >= -22.0 && value < 230.0, "{} out of range", value);
            assert_eq!(out.split('.').nth(1).map(str::len), Some(6));
        }
    }

    #[test]
    fn test_float_text_stays_below_max() {
        assert_eq!(format_micros(0.9999996, 1), "0.999999");
        assert_eq!(format_micros(0.99999999999, 1), "0.999999");
        assert_eq!(format_micros(1.0, 1), "0.999999");
        assert_eq!(format_micros(-0.0000004, 1), "-0.000001");
        assert_eq!(format_micros(-22.0, 230), "-22.000000");

        let rng = RandomSource::seeded(12);
        let producer = make_scalar(&scalar("float", 0, 1, 0), &rng).unwrap();
        for _ in 0..200_000 {
            let value: f64 = producer().unwrap().parse().unwrap();
            assert!((0.0..1.0).contains(&value), "{} out of range", value);
        }
    }

    #[test]
    fn test_string_range_length() {
        let rng = RandomSource::seeded(5);
        for _ in 0..100 {
            let producer = make_scalar(&scalar("string", 3, 12, 0), &rng).unwrap();
            let first = producer().unwrap();
            assert!((3..12).contains(&first.len()));
            assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
            // length is drawn once per producer
            assert_eq!(producer().unwrap().len(), first.len());
        }
    }

    #[test]
    fn test_string_range_negative_min_skipped() {
        let rng = RandomSource::seeded(5);
        assert!(make_scalar(&scalar("string", -3, 12, 0), &rng).is_none());
    }

    #[test]
    fn test_string_fixed_size() {
        let rng = RandomSource::seeded(9);
        let producer = make_scalar(&scalar("string", 0, 0, 20), &rng).unwrap();
        for _ in 0..50 {
            assert_eq!(producer().unwrap().len(), 20);
        }
    }

    #[test]
    fn test_size_mode_requires_string() {
        let rng = RandomSource::seeded(9);
        assert!(make_scalar(&scalar("int", 0, 0, 20), &rng).is_none());
        assert!(make_scalar(&scalar("float", 0, 0, 20), &rng).is_none());
        assert!(make_array(&array("int", 4, 0, 0, 20), &rng).is_none());
    }

    #[test]
    fn test_degenerate_constraints_skipped() {
        let rng = RandomSource::seeded(9);
        assert!(make_scalar(&scalar("int", 5, 5, 0), &rng).is_none());
        assert!(make_scalar(&scalar("string", 8, 2, 0), &rng).is_none());
        assert!(make_scalar(&scalar("uuid", 0, 10, 0), &rng).is_none());
        assert!(make_array(&array("int", 0, 0, 10, 0), &rng).is_none());
        assert!(make_array(&array("int", -4, 0, 10, 0), &rng).is_none());
    }

    #[test]
    fn test_int_array() {
        let rng = RandomSource::seeded(21);
        let producer = make_array(&array("int", 20, -145, 2529, 0), &rng).unwrap();
        let values: Vec<i64> = serde_json::from_str(&producer().unwrap()).unwrap();
        assert_eq!(values.len(), 20);
        assert!(values.iter().all(|v| (-145..2529).contains(v)));
    }

    #[test]
    fn test_float_array() {
        let rng = RandomSource::seeded(22);
        let producer = make_array(&array("float", 15, -10, 10, 0), &rng).unwrap();
        let values: Vec<f64> = serde_json::from_str(&producer().unwrap()).unwrap();
        assert_eq!(values.len(), 15);
        assert!(values.iter().all(|v| *v >= -10.0 && *v < 10.0));
    }

    #[test]
    fn test_string_range_array() {
        let rng = RandomSource::seeded(23);
        let producer = make_array(&array("string", 30, 1, 6, 0), &rng).unwrap();
        let values: Vec<String> = serde_json::from_str(&producer().unwrap()).unwrap();
        assert_eq!(values.len(), 30);
        assert!(values.iter().all(|v| (1..6).contains(&v.len())));
    }

    #[test]
    fn test_fixed_size_string_array_uses_element_size() {
        // Element length follows `size`, not `arraysize`.
        let rng = RandomSource::seeded(24);
        let producer = make_array(&array("string", 20, 0, 0, 10), &rng).unwrap();
        let values: Vec<String> = serde_json::from_str(&producer().unwrap()).unwrap();
        assert_eq!(values.len(), 20);
        assert!(values.iter().all(|v| v.len() == 10));
    }

    #[test]
    fn test_array_redraws_each_call() {
        let rng = RandomSource::seeded(25);
        let producer = make_array(&array("int", 16, 0, 1_000_000, 0), &rng).unwrap();
        assert_ne!(producer().unwrap(), producer().unwrap());
    }

    #[test]
    fn test_seeded_sources_are_deterministic() {
        let spec = array("string", 5, 0, 0, 8);
        let a = make_array(&spec, &RandomSource::seeded(42)).unwrap();
        let b = make_array(&spec, &RandomSource::seeded(42)).unwrap();
        assert_eq!(a().unwrap(), b().unwrap());
    }

    #[test]
    fn test_fork_is_independent_of_parent() {
        let parent = RandomSource::seeded(42);
        let child = parent.fork();
        let from_parent = make_array(&array("int", 8, 0, 1_000_000, 0), &parent).unwrap();
        let from_child = make_array(&array("int", 8, 0, 1_000_000, 0), &child).unwrap();
        assert_ne!(from_parent().unwrap(), from_child().unwrap());
    }

    #[test]
    fn test_spec_deserialization_defaults() {
        let spec: ArraySpec = serde_json::from_str(r#"{"type": "string", "arraysize": 3}"#).unwrap();
        assert_eq!(spec.array_size, 3);
        assert_eq!(spec.size, 0);
        assert_eq!(spec.constraint(), None);

        let spec: ScalarSpec = serde_json::from_str(r#"{"type": "int", "min": 1, "max": 9, "extra": true}"#).unwrap();
        assert_eq!(spec.element_type(), Some(ElementType::Int));
        assert_eq!(spec.constraint(), Some(Constraint::Range { min: 1, max: 9 }));
    }
}
