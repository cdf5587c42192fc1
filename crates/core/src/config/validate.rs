use super::{types::Config, BrokerBackend, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Work queue name is set
/// - Pool size and timeouts are not 0
/// - The memory broker is only used with an in-process worker pool
/// - The NATS backend gets a NATS URL and an ack wait longer than one job
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.broker.work_queue.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "broker.work_queue cannot be empty".to_string(),
        ));
    }

    if config.worker.pool_size == 0 {
        return Err(ConfigError::ValidationError(
            "worker.pool_size cannot be 0".to_string(),
        ));
    }

    if config.thumbnail.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "thumbnail.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.transcoder.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "transcoder.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.broker.backend == BrokerBackend::Memory
        && config.thumbnail.enabled
        && !config.worker.enabled
    {
        return Err(ConfigError::ValidationError(
            "broker.backend = \"memory\" requires worker.enabled = true".to_string(),
        ));
    }

    if config.broker.backend == BrokerBackend::Nats {
        validate_nats_url(&config.broker.url)?;

        // A worker may spend the full transcode and upload budget on one
        // request; a shorter ack wait gets it redelivered mid-flight.
        let job_secs = config.transcoder.timeout_secs + config.store.timeout_secs;
        if config.broker.ack_wait_secs <= job_secs {
            return Err(ConfigError::ValidationError(format!(
                "broker.ack_wait_secs ({}) must exceed transcoder.timeout_secs + store.timeout_secs ({})",
                config.broker.ack_wait_secs, job_secs
            )));
        }
    }

    Ok(())
}

const NATS_SCHEMES: &[&str] = &["nats", "tls"];

fn validate_nats_url(url: &str) -> Result<(), ConfigError> {
    // async-nats accepts a comma-separated server list.
    for server in url.split(',').map(str::trim) {
        let scheme = server.split_once("://").map(|(scheme, _)| scheme);
        match scheme {
            Some(scheme) if NATS_SCHEMES.contains(&scheme) => {}
            // A bare host:port is dialled as nats://
            None if !server.is_empty() => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "broker.url must use nats:// or tls:// with backend = \"nats\", got {}",
                    super::redact_credentials(server)
                )));
            }
        }
    }
    Ok(())
}
