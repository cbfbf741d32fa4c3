//! Business logic services
//!
//! Request validation and gate decisions, kept free of HTTP concerns so they
//! can be tested without a server.

pub mod auth_gate;
pub mod password_reset;
