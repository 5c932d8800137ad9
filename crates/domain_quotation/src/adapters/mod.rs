//! Adapters for the external delivery collaborators

pub mod circuit_breaker;
pub mod http;
pub mod renderer;
pub mod whatsapp;

pub use circuit_breaker::CircuitBreaker;
pub use http::HttpCollaboratorConfig;
pub use renderer::HttpDocumentRenderer;
pub use whatsapp::WhatsAppGateway;
