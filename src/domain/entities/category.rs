//! Command categories.
//!
//! A category groups commands by name and contributes middlewares and
//! afterwares that wrap every member. Membership is not stored here; the
//! registry derives it from each command's category field.

/// Command category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    description: String,
    middlewares: Vec<String>,
    afterwares: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            middlewares: Vec::new(),
            afterwares: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Middleware run before those of the member commands.
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middlewares.push(name.into());
        self
    }

    pub fn afterware(mut self, name: impl Into<String>) -> Self {
        self.afterwares.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn middlewares(&self) -> &[String] {
        &self.middlewares
    }

    pub fn afterwares(&self) -> &[String] {
        &self.afterwares
    }
}
