use std::io::Read;
use std::time::Duration;

use ureq::Agent;
use ureq::http::Response;

use crate::errors::MillError;

/// Build a blocking agent with an optional global per-call deadline.
///
/// Non-success statuses are returned as responses so callers decide how to
/// treat them.
pub fn build_agent(timeout: Option<Duration>) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(timeout)
        .http_status_as_error(false)
        .build();
    Agent::new_with_config(config)
}

/// Drain a response body into memory.
pub fn read_body(endpoint: &str, response: Response<ureq::Body>) -> Result<Vec<u8>, MillError> {
    let mut reader = response.into_body().into_reader();
    let mut body = Vec::new();
    reader.read_to_end(&mut body).map_err(|err| {
        if err.kind() == std::io::ErrorKind::TimedOut {
            MillError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            MillError::Transport {
                endpoint: endpoint.to_string(),
                reason: format!("failed reading response body: {err}"),
            }
        }
    })?;
    Ok(body)
}


#[cfg(test)]
mod tests {
    use super::test_server::spawn_one_shot_http;
    use super::*;

    #[test]
    fn non_success_status_is_returned_not_raised() {
        let (base_url, server) = spawn_one_shot_http(404, b"missing".to_vec());
        let agent = build_agent(Some(Duration::from_secs(5)));
        let response = agent.get(&base_url).call().unwrap();
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(read_body(&base_url, response).unwrap(), b"missing");
        server.join().unwrap();
    }
}
