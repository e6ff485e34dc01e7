//! gRPC load runner and the ping/health server it is tested against.
pub mod connection;
pub mod destination;
pub mod outcome;
pub mod runner;
pub mod server;
pub mod tls;

#[cfg(test)]
mod tests;

pub mod proto {
    tonic::include_proto!("grpcload");
}

pub use connection::{CallKind, Connection, StreamPool};
pub use destination::{DEFAULT_GRPC_PORT, Destination, normalize_destination, parse_destination};
pub use outcome::{SERVING, status_name};
pub use runner::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STREAMS, GrpcRunnerOptions,
    RunPhase, run_grpc_load, run_grpc_test,
};
pub use server::{PingServer, PingServerHandle, PingServerOptions};
pub use tls::TransportSecurity;
