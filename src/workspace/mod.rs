// Editor shell state backed by the expiring cache.
// Tab sessions, the workspace file tree, and syntax-highlight memoization.

pub mod file_tree;
pub mod highlight;
pub mod session;
pub mod types;

pub use file_tree::FileTreeClient;
pub use highlight::highlight_cached;
pub use session::TabSession;
pub use types::{FileNode, NodeType, Tab};
