use crate::error::ValidationError;
use crate::grpc::{GrpcRunnerOptions, PingServerOptions};
use crate::periodic::{RunOptions, StopCondition};

use super::cli::{LoadArgs, ServerArgs};

impl LoadArgs {
    #[must_use]
    pub fn stop_condition(&self) -> StopCondition {
        match self.exactly {
            Some(count) => StopCondition::Count(count.get()),
            None => StopCondition::Duration(self.duration),
        }
    }

    /// Builds the runner options for this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error when no destination was given.
    pub fn runner_options(&self) -> Result<GrpcRunnerOptions, ValidationError> {
        let destination = self
            .destination
            .clone()
            .filter(|destination| !destination.trim().is_empty())
            .ok_or(ValidationError::DestinationEmpty)?;
        Ok(GrpcRunnerOptions {
            run: RunOptions {
                qps: self.qps,
                num_threads: self.concurrency.get(),
                stop: self.stop_condition(),
                resolution: self.resolution,
                profiler: self.profile.clone(),
                label: self.label.clone(),
            },
            destination,
            ca_cert: self.ca_cert.clone(),
            cert: self.cert.clone(),
            cert_override: self.cert_override.clone(),
            service: self.service.clone(),
            streams: self.streams.get(),
            delay: self.delay,
            allow_initial_errors: self.allow_initial_errors,
            use_ping: self.ping,
            payload: self.payload.clone(),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        })
    }
}

impl From<&ServerArgs> for PingServerOptions {
    fn from(args: &ServerArgs) -> Self {
        Self {
            port: args.port,
            cert: args.cert.clone(),
            key: args.key.clone(),
            health_service: args.service.clone(),
            max_concurrent_streams: args.max_streams,
        }
    }
}
