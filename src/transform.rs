use std::thread;
use std::time::Duration;

/// Outcome of applying a transform to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// A new owned output record; may legitimately be empty
    Output(String),
    /// The transform chose to produce nothing for this input
    Drop,
}

/// A pure mapping from one input line to at most one output line.
///
/// Transforms are shared between stages behind an `Arc`, so they take `&self`
/// and must not keep anything from the input after returning. A stage never
/// hands the end-of-stream marker to its transform.
pub trait Transform: Send + Sync + 'static {
    /// Get the name used for the stage running this transform
    fn name(&self) -> &str;

    /// Transform a single input line
    fn apply(&self, input: &str) -> Transformed;

    /// Whether outputs are also written to the sink when the stage is not
    /// terminal. A terminal stage writes each output once either way.
    fn taps_output(&self) -> bool {
        false
    }
}

/// Passes every record through unchanged
#[derive(Debug)]
pub struct Identity;

impl Transform for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn apply(&self, input: &str) -> Transformed {
        Transformed::Output(input.to_owned())
    }
}

/// Converts ASCII letters to uppercase
#[derive(Debug)]
pub struct Uppercaser;

impl Transform for Uppercaser {
    fn name(&self) -> &str {
        "uppercaser"
    }

    fn apply(&self, input: &str) -> Transformed {
        Transformed::Output(input.to_ascii_uppercase())
    }
}

/// Swaps the case of ASCII letters
#[derive(Debug)]
pub struct Flipper;

impl Transform for Flipper {
    fn name(&self) -> &str {
        "flipper"
    }

    fn apply(&self, input: &str) -> Transformed {
        let flipped = input
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() {
                    c.to_ascii_uppercase()
                } else if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c
                }
            })
            .collect();
        Transformed::Output(flipped)
    }
}

/// Moves the last character to the front
#[derive(Debug)]
pub struct Rotator;

impl Transform for Rotator {
    fn name(&self) -> &str {
        "rotator"
    }

    fn apply(&self, input: &str) -> Transformed {
        let mut chars = input.chars();
        match chars.next_back() {
            Some(last) => {
                let mut rotated = String::with_capacity(input.len());
                rotated.push(last);
                rotated.push_str(chars.as_str());
                Transformed::Output(rotated)
            }
            None => Transformed::Output(String::new()),
        }
    }
}

/// Puts a single space between consecutive characters
#[derive(Debug)]
pub struct Expander;

impl Transform for Expander {
    fn name(&self) -> &str {
        "expander"
    }

    fn apply(&self, input: &str) -> Transformed {
        let mut expanded = String::with_capacity(input.len() * 2);
        for (i, c) in input.chars().enumerate() {
            if i > 0 {
                expanded.push(' ');
            }
            expanded.push(c);
        }
        Transformed::Output(expanded)
    }
}

/// Passes records through and writes each one to the sink on the way
#[derive(Debug)]
pub struct Logger;

impl Transform for Logger {
    fn name(&self) -> &str {
        "logger"
    }

    fn apply(&self, input: &str) -> Transformed {
        Transformed::Output(input.to_owned())
    }

    fn taps_output(&self) -> bool {
        true
    }
}

/// Passes records through after pausing once per character
#[derive(Debug)]
pub struct Typewriter {
    per_char: Duration,
}

impl Typewriter {
    /// Default pause per character
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

    /// Create a typewriter with the default per-character delay
    pub fn new() -> Self {
        Self::with_delay(Self::DEFAULT_DELAY)
    }

    /// Create a typewriter with a custom per-character delay
    pub fn with_delay(per_char: Duration) -> Self {
        Self { per_char }
    }
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Typewriter {
    fn name(&self) -> &str {
        "typewriter"
    }

    fn apply(&self, input: &str) -> Transformed {
        let mut typed = String::with_capacity(input.len());
        for c in input.chars() {
            typed.push(c);
            thread::sleep(self.per_char);
        }
        Transformed::Output(typed)
    }
}

/// A transform that maps every record with a closure
pub struct MapTransform<F>
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    name: String,
    mapper: F,
}

impl<F> MapTransform<F>
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    /// Create a new map transform
    pub fn new(name: impl Into<String>, mapper: F) -> Self {
        Self {
            name: name.into(),
            mapper,
        }
    }
}

impl<F> Transform for MapTransform<F>
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &str) -> Transformed {
        Transformed::Output((self.mapper)(input))
    }
}

/// A transform that passes through records matching a predicate and drops the rest
pub struct FilterTransform<F>
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterTransform<F>
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    /// Create a new filter transform
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Transform for FilterTransform<F>
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &str) -> Transformed {
        if (self.predicate)(input) {
            Transformed::Output(input.to_owned())
        } else {
            Transformed::Drop
        }
    }
}

/// A transform backed by a closure that decides the full outcome itself
pub struct FnTransform<F>
where
    F: Fn(&str) -> Transformed + Send + Sync + 'static,
{
    name: String,
    func: F,
}

impl<F> FnTransform<F>
where
    F: Fn(&str) -> Transformed + Send + Sync + 'static,
{
    /// Create a new closure-backed transform
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Transform for FnTransform<F>
where
    F: Fn(&str) -> Transformed + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &str) -> Transformed {
        (self.func)(input)
    }
}
