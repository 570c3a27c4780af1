mod catalog;
mod prompt;
mod resource;
mod tool;

pub use catalog::{BindError, CapabilitySink, Catalog, ToolSchema};
pub use prompt::PromptTemplate;
pub use resource::Resource;
pub use tool::{Tool, ToolCall, ToolOutput};
