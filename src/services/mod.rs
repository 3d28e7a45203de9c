/// Per-session timer authority tasks and their command surface.
pub mod authority;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Session lifecycle and organizer token management.
pub mod session_service;
/// Organizer timer commands and public timer snapshots.
pub mod timer_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
