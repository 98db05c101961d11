// Transport bindings: thin adapters between a wire format and the shared Dispatcher

pub mod http;
pub mod stdio;

pub use http::{HttpServer, HttpServerConfig};
pub use stdio::StdioServer;
