// Parrot Core Library
// MCP dispatcher, tool registry and transports for the text-to-speech server

pub mod mcp;
pub mod tools;
pub mod transport;

pub use mcp::{Dispatcher, DispatchError, ServerInfo};
pub use tools::{Tool, ToolError, ToolRegistry, ToolResult};
pub use transport::{HttpServer, HttpServerConfig, StdioServer};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParrotError {
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, ParrotError>;
