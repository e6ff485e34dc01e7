use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use tempfile::TempDir;

use super::*;
use crate::error::{AppError, AppResult, ConnectionError};
use crate::metrics::CALL_ERROR;
use crate::periodic::{RunOptions, RunResult, StopCondition};
use crate::shutdown::{request_shutdown, shutdown_channel};

use super::runner::CallSequence;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

/// Throwaway CA, a server certificate it signed and an unrelated
/// self-signed server certificate, all for `localhost`.
struct TestPki {
    _dir: TempDir,
    ca_cert: PathBuf,
    server_cert: PathBuf,
    server_key: PathBuf,
    self_signed_cert: PathBuf,
    self_signed_key: PathBuf,
}

fn rcgen_error(err: rcgen::Error) -> AppError {
    AppError::validation(format!("Certificate generation failed: {}", err))
}

fn test_pki() -> AppResult<TestPki> {
    let dir = tempfile::tempdir()?;

    let mut ca_params = CertificateParams::new(Vec::<String>::new()).map_err(rcgen_error)?;
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "grpcload test CA");
    let ca_key = KeyPair::generate().map_err(rcgen_error)?;
    let ca = ca_params.self_signed(&ca_key).map_err(rcgen_error)?;

    let server_params =
        CertificateParams::new(vec!["localhost".to_owned()]).map_err(rcgen_error)?;
    let server_key = KeyPair::generate().map_err(rcgen_error)?;
    let server = server_params
        .signed_by(&server_key, &ca, &ca_key)
        .map_err(rcgen_error)?;

    let self_signed =
        rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).map_err(rcgen_error)?;

    let pki = TestPki {
        ca_cert: dir.path().join("ca.crt"),
        server_cert: dir.path().join("server.crt"),
        server_key: dir.path().join("server.key"),
        self_signed_cert: dir.path().join("self.crt"),
        self_signed_key: dir.path().join("self.key"),
        _dir: dir,
    };
    std::fs::write(&pki.ca_cert, ca.pem())?;
    std::fs::write(&pki.server_cert, server.pem())?;
    std::fs::write(&pki.server_key, server_key.serialize_pem())?;
    std::fs::write(&pki.self_signed_cert, self_signed.cert.pem())?;
    std::fs::write(&pki.self_signed_key, self_signed.key_pair.serialize_pem())?;
    Ok(pki)
}

async fn start_server(
    cert: Option<&PathBuf>,
    key: Option<&PathBuf>,
    max_concurrent_streams: u32,
) -> AppResult<PingServerHandle> {
    PingServer::start(PingServerOptions {
        port: 0,
        cert: cert.cloned(),
        key: key.cloned(),
        health_service: "bar".to_owned(),
        max_concurrent_streams,
    })
    .await
}

fn health_options(destination: String) -> GrpcRunnerOptions {
    GrpcRunnerOptions {
        run: RunOptions {
            qps: 100.0,
            num_threads: 2,
            stop: StopCondition::Count(10),
            resolution: 0.00001,
            ..RunOptions::default()
        },
        destination,
        service: "bar".to_owned(),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(2),
        ..GrpcRunnerOptions::default()
    }
}

fn expect_all_serving(name: &str, result: &RunResult) -> AppResult<()> {
    let count = result.duration_histogram.count();
    let outcome_total: u64 = result.ret_codes.values().sum();
    if count == 0 || outcome_total != count || result.ret_code_count(SERVING) != count {
        return Err(AppError::validation(format!(
            "{}: expected {} SERVING calls, got {:?}",
            name, count, result.ret_codes
        )));
    }
    Ok(())
}

fn expect_bring_up_failure(name: &str, outcome: AppResult<RunResult>) -> AppResult<()> {
    if let Err(err) = &outcome
        && !err.is_connection()
    {
        return Err(AppError::validation(format!(
            "{}: expected a connection error, got {}",
            name, err
        )));
    }
    match outcome {
        Err(AppError::Connection(ConnectionError::ProbeFailed { .. })) => Ok(()),
        Err(err) => Err(AppError::validation(format!(
            "{}: unexpected error {}",
            name, err
        ))),
        Ok(result) => Err(AppError::validation(format!(
            "{}: expected a bring-up failure, got {:?}",
            name, result.ret_codes
        ))),
    }
}

#[test]
fn plaintext_run_against_healthy_server() -> AppResult<()> {
    run_async_test(async {
        let server = start_server(None, None, 0).await?;
        let options = health_options(format!("127.0.0.1:{}", server.port()));
        let result = run_grpc_load(&options).await?;
        expect_all_serving("plaintext", &result)?;
        if result.duration_histogram.count() != 10 {
            return Err(AppError::validation("Expected exactly 10 calls"));
        }
        server.shutdown().await
    })
}

#[test]
fn whole_server_health_is_serving() -> AppResult<()> {
    run_async_test(async {
        let server = start_server(None, None, 0).await?;
        let mut options = health_options(format!("127.0.0.1:{}", server.port()));
        options.service = String::new();
        let result = run_grpc_load(&options).await?;
        expect_all_serving("empty service", &result)?;
        server.shutdown().await
    })
}

#[test]
fn tls_run_with_ca_verification() -> AppResult<()> {
    run_async_test(async {
        let pki = test_pki()?;
        let server = start_server(Some(&pki.server_cert), Some(&pki.server_key), 0).await?;
        let mut options = health_options(format!("localhost:{}", server.port()));
        options.ca_cert = Some(pki.ca_cert.clone());
        let result = run_grpc_load(&options).await?;
        expect_all_serving("ca verified", &result)?;
        server.shutdown().await
    })
}

#[test]
fn tls_run_trusting_server_certificate() -> AppResult<()> {
    run_async_test(async {
        let pki = test_pki()?;
        let server =
            start_server(Some(&pki.self_signed_cert), Some(&pki.self_signed_key), 0).await?;
        let mut options = health_options(format!("127.0.0.1:{}", server.port()));
        options.cert = Some(pki.self_signed_cert.clone());
        options.cert_override = Some("localhost".to_owned());
        let result = run_grpc_load(&options).await?;
        expect_all_serving("direct trust", &result)?;
        server.shutdown().await
    })
}

#[test]
fn mismatched_transport_fails_bring_up() -> AppResult<()> {
    run_async_test(async {
        let pki = test_pki()?;
        let plain = start_server(None, None, 0).await?;
        let secure = start_server(Some(&pki.server_cert), Some(&pki.server_key), 0).await?;

        let insecure_to_tls = health_options(format!("localhost:{}", secure.port()));
        expect_bring_up_failure("plaintext to TLS", run_grpc_load(&insecure_to_tls).await)?;

        let mut tls_to_plain = health_options(format!("localhost:{}", plain.port()));
        tls_to_plain.ca_cert = Some(pki.ca_cert.clone());
        expect_bring_up_failure("TLS to plaintext", run_grpc_load(&tls_to_plain).await)?;

        let mut wrong_name = health_options(format!("localhost:{}", secure.port()));
        wrong_name.ca_cert = Some(pki.ca_cert.clone());
        wrong_name.cert_override = Some("invalidName".to_owned());
        expect_bring_up_failure("certificate name override", run_grpc_load(&wrong_name).await)?;

        let mut untrusted = health_options(format!("localhost:{}", secure.port()));
        untrusted.cert = Some(pki.self_signed_cert.clone());
        expect_bring_up_failure("untrusted certificate", run_grpc_load(&untrusted).await)?;

        plain.shutdown().await?;
        secure.shutdown().await
    })
}

#[test]
fn tolerated_bring_up_failure_records_errors() -> AppResult<()> {
    run_async_test(async {
        let pki = test_pki()?;
        let secure = start_server(Some(&pki.server_cert), Some(&pki.server_key), 0).await?;
        let mut options = health_options(format!("localhost:{}", secure.port()));
        options.allow_initial_errors = true;

        let result = run_grpc_load(&options).await?;
        let count = result.duration_histogram.count();
        if count != 10 || result.ret_code_count(CALL_ERROR) != count {
            return Err(AppError::validation(format!(
                "Expected every call to fail, got {:?}",
                result.ret_codes
            )));
        }
        secure.shutdown().await
    })
}

#[test]
fn unknown_service_is_a_bring_up_failure() -> AppResult<()> {
    run_async_test(async {
        let server = start_server(None, None, 0).await?;
        let mut options = health_options(format!("127.0.0.1:{}", server.port()));
        options.service = "unknown".to_owned();
        expect_bring_up_failure("unknown service", run_grpc_load(&options).await)?;

        options.allow_initial_errors = true;
        let result = run_grpc_load(&options).await?;
        if result.error_count() != result.duration_histogram.count() {
            return Err(AppError::validation(format!(
                "Expected only errors, got {:?}",
                result.ret_codes
            )));
        }
        server.shutdown().await
    })
}

#[test]
fn unreachable_destination_fails_bring_up() -> AppResult<()> {
    run_async_test(async {
        let server = start_server(None, None, 0).await?;
        let port = server.port();
        server.shutdown().await?;
        let options = health_options(format!("127.0.0.1:{}", port));
        expect_bring_up_failure("closed port", run_grpc_load(&options).await)
    })
}

#[test]
fn ping_mode_echoes_and_counts_serving() -> AppResult<()> {
    run_async_test(async {
        let server = start_server(None, None, 0).await?;
        let mut options = health_options(format!("127.0.0.1:{}", server.port()));
        options.use_ping = true;
        options.payload = "hello".to_owned();
        options.delay = Duration::from_millis(5);
        let result = run_grpc_load(&options).await?;
        expect_all_serving("ping", &result)?;
        if result.duration_histogram.min() < Duration::from_millis(5) {
            return Err(AppError::validation(format!(
                "Ping returned before its delay: {:?}",
                result.duration_histogram.min()
            )));
        }
        server.shutdown().await
    })
}

#[test]
fn stream_ceiling_queues_extra_calls() -> AppResult<()> {
    run_async_test(async {
        let server = start_server(None, None, 10).await?;
        let delay = Duration::from_millis(20);
        let mut options = health_options(format!("127.0.0.1:{}", server.port()));
        options.use_ping = true;
        options.delay = delay;
        options.run.num_threads = 1;
        options.streams = 10;
        options.run.stop = StopCondition::Count(20);

        let within = run_grpc_load(&options).await?;
        expect_all_serving("10 streams", &within)?;
        let avg_within = Duration::from_secs_f64(within.duration_histogram.avg());
        if avg_within < delay || avg_within > delay.saturating_mul(3) {
            return Err(AppError::validation(format!(
                "Ping delay not applied: avg {:?} for {:?}",
                avg_within, delay
            )));
        }

        options.streams = 20;
        options.run.stop = StopCondition::Count(40);
        let beyond = run_grpc_load(&options).await?;
        expect_all_serving("20 streams", &beyond)?;
        let avg_beyond = Duration::from_secs_f64(beyond.duration_histogram.avg());
        if avg_beyond < delay.mul_f64(1.5) {
            return Err(AppError::validation(format!(
                "Expected queued calls to slow down: avg {:?} vs {:?}",
                avg_beyond, avg_within
            )));
        }
        server.shutdown().await
    })
}

#[test]
fn invalid_options_fail_before_dialling() -> AppResult<()> {
    run_async_test(async {
        let mut options = health_options("   ".to_owned());
        match run_grpc_load(&options).await {
            Err(AppError::Validation(_)) => {}
            other => {
                return Err(AppError::validation(format!(
                    "Expected a validation error, got {:?}",
                    other.map(|result| result.ret_codes)
                )));
            }
        }
        options.destination = "localhost".to_owned();
        options.streams = 0;
        match run_grpc_load(&options).await {
            Err(AppError::Validation(_)) => Ok(()),
            other => Err(AppError::validation(format!(
                "Expected a validation error, got {:?}",
                other.map(|result| result.ret_codes)
            ))),
        }
    })
}

#[test]
fn incomplete_server_identity_is_rejected() -> AppResult<()> {
    run_async_test(async {
        let pki = test_pki()?;
        match start_server(Some(&pki.server_cert), None, 0).await {
            Err(AppError::Validation(_)) => Ok(()),
            Err(err) => Err(AppError::validation(format!("Unexpected error {}", err))),
            Ok(handle) => {
                handle.shutdown().await?;
                Err(AppError::validation("Server started without a key"))
            }
        }
    })
}

#[test]
fn shutdown_interrupts_bring_up() -> AppResult<()> {
    run_async_test(async {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let mut options = health_options(format!("127.0.0.1:{}", port));
        options.run.num_threads = 4;
        options.allow_initial_errors = true;
        options.connect_timeout = Duration::from_secs(1);
        options.request_timeout = Duration::from_secs(1);

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            request_shutdown(&shutdown_tx);
        });
        let started = tokio::time::Instant::now();
        let result = run_grpc_test(&options, shutdown_rx).await?;
        let elapsed = started.elapsed();
        trigger.await?;
        silent.abort();

        if elapsed >= Duration::from_millis(900) {
            return Err(AppError::validation(format!(
                "Bring-up ignored shutdown for {:?}",
                elapsed
            )));
        }
        if result.duration_histogram.count() != 0 {
            return Err(AppError::validation(format!(
                "Expected no calls after shutdown, got {:?}",
                result.ret_codes
            )));
        }
        Ok(())
    })
}

#[test]
fn call_sequence_counts_per_worker() -> AppResult<()> {
    let sequence = CallSequence::new(2);
    let first: Vec<i64> = (0..3).map(|_| sequence.next_seq(0)).collect();
    let second = sequence.next_seq(1);
    if first != [0, 1, 2] || second != 0 {
        return Err(AppError::validation(format!(
            "Unexpected sequence {:?} / {}",
            first, second
        )));
    }
    if sequence.next_seq(5) != 0 {
        return Err(AppError::validation("Unknown worker should start at 0"));
    }
    Ok(())
}

#[test]
fn connection_pool_matches_streams() -> AppResult<()> {
    run_async_test(async {
        let destination = parse_destination("127.0.0.1:1");
        let connection = Connection::open(3, &destination, None, Duration::from_secs(1), 4)?;
        let pool = connection.pool();
        if connection.index() != 3 || pool.size() != 4 || pool.available() != pool.size() {
            return Err(AppError::validation(format!(
                "Unexpected pool {} of {} on connection {}",
                pool.available(),
                pool.size(),
                connection.index()
            )));
        }
        Ok(())
    })
}
