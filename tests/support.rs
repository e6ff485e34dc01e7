use std::ffi::OsStr;
use std::process::{Command, Output};

use grpcload::grpc::{PingServer, PingServerHandle, PingServerOptions};

/// In-process ping/health server on an ephemeral port. Stops on drop.
pub struct ServerHandle {
    runtime: Option<tokio::runtime::Runtime>,
    server: Option<PingServerHandle>,
    port: u16,
}

impl ServerHandle {
    #[must_use]
    pub fn destination(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let (Some(runtime), Some(server)) = (self.runtime.take(), self.server.take()) {
            drop(runtime.block_on(server.shutdown()));
        }
    }
}

/// Start a plaintext ping server for tests.
///
/// # Errors
///
/// Returns an error if the runtime or the server cannot be started.
pub fn spawn_ping_server() -> Result<ServerHandle, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| format!("build server runtime failed: {}", err))?;
    let options = PingServerOptions {
        port: 0,
        ..PingServerOptions::default()
    };
    let server = runtime
        .block_on(PingServer::start(options))
        .map_err(|err| format!("start ping server failed: {}", err))?;
    let port = server.port();
    Ok(ServerHandle {
        runtime: Some(runtime),
        server: Some(server),
        port,
    })
}

/// Run the `grpcload` binary with the given args.
///
/// # Errors
///
/// Returns an error if the binary cannot be started.
pub fn run_grpcload<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = grpcload_bin()?;
    Command::new(bin)
        .args(args)
        .env("GRPCLOAD_LOG", "error")
        .env_remove("GRPCLOAD_CONFIG")
        .output()
        .map_err(|err| format!("run grpcload failed: {}", err))
}

fn grpcload_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_grpcload").map_or_else(
        || Err("CARGO_BIN_EXE_grpcload missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}

/// Parse the JSON summary printed on stdout.
///
/// # Errors
///
/// Returns an error when the run failed or stdout is not JSON.
pub fn summary_from_output(output: &Output) -> Result<serde_json::Value, String> {
    if !output.status.success() {
        return Err(format!(
            "stdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    serde_json::from_slice(&output.stdout).map_err(|err| {
        format!(
            "summary is not JSON ({}): {}",
            err,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// Count of one outcome code in a JSON summary.
#[must_use]
pub fn ret_code(summary: &serde_json::Value, code: i32) -> Option<u64> {
    summary
        .get("ret_codes")
        .and_then(|codes| codes.get(code.to_string()))
        .and_then(serde_json::Value::as_u64)
}
