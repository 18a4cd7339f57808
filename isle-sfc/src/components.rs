//! The component registry the build knows about, and which of its files are
//! islands.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentMode {
    Server,
    Client,
    #[default]
    #[serde(alias = "all")]
    Universal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub pascal_name: String,
    pub file_path: PathBuf,
    #[serde(default)]
    pub island: bool,
    #[serde(default)]
    pub mode: ComponentMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRegistry {
    components: Vec<Component>,
}

impl ComponentRegistry {
    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Components rendered only on the server: explicit islands, and
    /// server-mode components without a client-mode counterpart of the same
    /// name.
    pub fn islands(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|component| {
            component.island
                || (component.mode == ComponentMode::Server
                    && !self.components.iter().any(|c| {
                        c.pascal_name == component.pascal_name && c.mode == ComponentMode::Client
                    }))
        })
    }

    /// Whether the module `id` is the file of an island. Any `?query` suffix
    /// the bundler appended to the id is ignored.
    pub fn is_island(&self, id: &str) -> bool {
        let path = Path::new(module_path(id));
        self.islands().any(|c| c.file_path == path)
    }
}

fn module_path(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_suffix_is_ignored() {
        assert_eq!(module_path("/a/B.vue?vue&type=template"), "/a/B.vue");
        assert_eq!(module_path("/a/B.vue"), "/a/B.vue");
    }
}
