use serde::{Deserialize, Serialize};

/// Names of the compiler helpers the reconstructor recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Top-level function names that hold the server render output.
    pub render_functions: Vec<String>,
    /// Appends a chunk of markup to the output buffer.
    pub push: String,
    /// `v-for` over markup: `(collection, (item) => { ... })`.
    pub render_list: String,
    /// Renders a child component: `(component, props, slots, parent)`.
    pub render_component: String,
    /// Wraps slot functions.
    pub with_ctx: String,
    /// Merges static and dynamic slot definitions.
    pub create_slots: String,
    /// `v-for` over slot definitions inside `create_slots`.
    pub render_list_slots: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            render_functions: ["_sfc_ssrRender", "_ssrRender", "_sfc_render", "ssrRender"]
                .map(String::from)
                .to_vec(),
            push: "_push".to_string(),
            render_list: "_ssrRenderList".to_string(),
            render_component: "_ssrRenderComponent".to_string(),
            with_ctx: "_withCtx".to_string(),
            create_slots: "_createSlots".to_string(),
            render_list_slots: "_renderList".to_string(),
        }
    }
}
