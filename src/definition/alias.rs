//! Service aliases.

use serde::Serialize;

/// An alternative id for another service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alias {
    /// Id of the aliased service, which may itself be an alias.
    target: String,
    /// Private aliases are removed once references to them are rewritten.
    public: bool,
}

impl Alias {
    /// A private alias to `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            public: false,
        }
    }

    #[must_use]
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }

    pub fn is_public(&self) -> bool {
        self.public
    }
}

impl std::fmt::Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.target)
    }
}
