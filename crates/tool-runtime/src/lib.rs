pub mod conversation;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod runtime;
pub mod stream;
pub mod tool;
pub mod tools;

pub use conversation::{Conversation, Message, Role};
pub use prompt::{system_preamble, SHORTY_SYSTEM_MESSAGE};
pub use provider::{LlmError, ModelClient, ModelResponse};
pub use registry::{RegistryError, ToolRegistry, ValidatedArguments, ValidationError};
pub use runtime::{DispatchError, DispatchLoop};
pub use stream::{EventStream, StreamEvent, StreamedTurn};
pub use tool::{ParamType, Parameter, Tool, ToolCall, ToolDefinition, ToolError, ToolResult};
pub use tools::{default_registry, ClicksReportTool, CreateShortyTool};
