// Shared components
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

// Core fan-out
pub mod bus;
pub mod hub;
pub mod notification;

// Application layer
pub mod api;
pub mod server;
pub mod websocket;
