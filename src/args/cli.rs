use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::grpc::DEFAULT_GRPC_PORT;
use crate::periodic::{DEFAULT_QPS, DEFAULT_RESOLUTION};

use super::parsers::{
    parse_duration_allow_zero, parse_duration_arg, parse_positive_u64, parse_positive_usize,
    parse_qps, parse_resolution,
};
use super::types::{PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Rate-paced gRPC load tester - precise QPS across workers and multiplexed streams, TLS bring-up checks, and merged latency/outcome statistics."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (GRPCLOAD_LOG / RUST_LOG take precedence)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drive a gRPC health or ping target at a fixed rate
    Load(LoadArgs),
    /// Serve grpc.health.v1 and the ping echo service
    Server(ServerArgs),
}

#[derive(Debug, Args, Clone)]
pub struct LoadArgs {
    /// Target as host, host:port, [ipv6]:port or http(s)://host[:port]
    #[arg(value_name = "DESTINATION")]
    pub destination: Option<String>,

    /// Target aggregate calls per second (fractions allowed)
    #[arg(long = "qps", default_value_t = DEFAULT_QPS, value_parser = parse_qps)]
    pub qps: f64,

    /// Number of connections; each one gets --streams workers
    #[arg(long = "concurrency", short = 'c', default_value = "4", value_parser = parse_positive_usize)]
    pub concurrency: PositiveUsize,

    /// Run duration (supports ms/s/m/h)
    #[arg(
        long = "duration",
        short = 't',
        default_value = "5s",
        value_parser = parse_duration_arg,
        conflicts_with = "exactly"
    )]
    pub duration: Duration,

    /// Make exactly this many calls instead of running for --duration
    #[arg(long = "exactly", short = 'n', value_parser = parse_positive_u64)]
    pub exactly: Option<PositiveU64>,

    /// Histogram bucket width in seconds
    #[arg(long = "resolution", default_value_t = DEFAULT_RESOLUTION, value_parser = parse_resolution)]
    pub resolution: f64,

    /// CA bundle used to verify the server (enables TLS)
    #[arg(long = "cacert")]
    pub ca_cert: Option<PathBuf>,

    /// Server certificate to trust directly (enables TLS, ignored with --cacert)
    #[arg(long = "cert")]
    pub cert: Option<PathBuf>,

    /// Name expected in the server certificate instead of the host
    #[arg(long = "cert-override")]
    pub cert_override: Option<String>,

    /// Health service name to check (empty checks the whole server)
    #[arg(long = "service", default_value = "")]
    pub service: String,

    /// Concurrent streams per connection
    #[arg(long = "streams", default_value = "1", value_parser = parse_positive_usize)]
    pub streams: PositiveUsize,

    /// Call the ping echo service instead of the health check
    #[arg(long = "ping")]
    pub ping: bool,

    /// Payload echoed by ping calls
    #[arg(long = "payload", default_value = "")]
    pub payload: String,

    /// Server side pause of each ping call (supports ms/s/m/h)
    #[arg(long = "delay", default_value = "0", value_parser = parse_duration_allow_zero)]
    pub delay: Duration,

    /// Keep going when the initial call of a connection fails
    #[arg(long = "allow-initial-errors")]
    pub allow_initial_errors: bool,

    /// Write a per-worker JSON run profile to this path
    #[arg(long = "profile")]
    pub profile: Option<PathBuf>,

    /// Label attached to the run's log records
    #[arg(long = "label")]
    pub label: Option<String>,

    /// Dial timeout per connection (supports ms/s/m/h)
    #[arg(long = "connect-timeout", default_value = "5s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Timeout of each call (supports ms/s/m/h)
    #[arg(long = "timeout", default_value = "10s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Print the summary as JSON
    #[arg(long = "json")]
    pub json: bool,

    /// Also write the JSON summary to this file
    #[arg(long = "output", short = 'o')]
    pub output: Option<PathBuf>,

    /// Path to config file (TOML or JSON); defaults to grpcload.toml/grpcload.json
    #[arg(long = "config", env = "GRPCLOAD_CONFIG")]
    pub config: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ServerArgs {
    /// Port to listen on, 0 for an ephemeral one
    #[arg(long = "port", default_value_t = DEFAULT_GRPC_PORT)]
    pub port: u16,

    /// PEM certificate; serve TLS together with --key
    #[arg(long = "cert", requires = "key")]
    pub cert: Option<PathBuf>,

    /// PEM private key for --cert
    #[arg(long = "key", requires = "cert")]
    pub key: Option<PathBuf>,

    /// Health service name reported as SERVING
    #[arg(long = "service", default_value = "")]
    pub service: String,

    /// HTTP/2 max concurrent streams per connection (0 keeps the default)
    #[arg(long = "max-streams", default_value_t = 0)]
    pub max_streams: u32,
}
