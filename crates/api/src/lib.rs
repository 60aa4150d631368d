pub mod registry;
pub mod router;
pub mod server;

pub use registry::{all_tools, find_tool, ToolDescriptor};
pub use router::{ToolError, ToolRouter};
pub use server::{serve_stdio, ServeError, SpotdeskServer};
