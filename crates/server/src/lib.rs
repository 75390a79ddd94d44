//! HTTP surface for Brigade.
//!
//! Wires the credential chain from `brigade-auth` into a tower layer and
//! exposes the notification dispatcher from `brigade-notify` over a small
//! JSON API.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;
