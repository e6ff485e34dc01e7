//! Core library for the `grpcload` CLI.
//!
//! This crate provides the building blocks used by the binary: a rate-paced
//! periodic scheduler, latency/outcome aggregation, the gRPC health and ping
//! runner with its test server, CLI argument types and configuration
//! parsing. The primary user-facing interface is the `grpcload`
//! command-line application.
pub mod args;
pub mod config;
pub mod entry;
pub mod error;
pub mod grpc;
pub mod logger;
pub mod metrics;
pub mod periodic;
pub mod shutdown;
pub mod shutdown_handlers;
mod system;

#[cfg(test)]
mod test_support;
