pub mod error;
pub mod markup;
pub mod options;
pub mod reconstruct;
pub mod render_tree;
mod script;

pub use error::{ErrorKind, ReconstructError, ReconstructResult};
pub use markup::{MarkupToken, PseudoMarkup};
pub use options::Options;
pub use reconstruct::reconstruct;
pub use render_tree::{Binding, FragmentMarker, NodeId, NodeKind, NodeRef, Tree};
