use std::{borrow::Cow, fmt::Display};

/// Path to the resource attribute a diagnostic is about
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct AttributePath {
    pub steps: Vec<Cow<'static, str>>,
}

impl AttributePath {
    /// Create a new attribute path with the `root` attribute
    pub fn new<T: Into<Cow<'static, str>>>(root: T) -> Self {
        Self {
            steps: vec![root.into()],
        }
    }
    /// The path points at the resource itself
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        for name in &self.steps {
            f.write_fmt(format_args!("{}{}", sep, name))?;
            sep = ".";
        }
        Ok(())
    }
}
