use serde::{Deserialize, Serialize};

/// An addon available from the platform repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryAddon {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub category: String,
}

impl RepositoryAddon {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            author: String::new(),
            description: String::new(),
            category: String::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// A repository entry annotated with local installation state.
///
/// The flags are computed against the registry at read time; they are never
/// stored on the catalog side.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryListing {
    pub addon: RepositoryAddon,
    pub installed: bool,
    pub update_available: bool,
}
