use thiserror::Error;

/// Failure of a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced by the aggregator.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("{provider} request failed: {source}")]
    ProviderCallFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("provider task ended without reporting ({received} of {expected} results received)")]
    ProviderTaskAborted { received: usize, expected: usize },

    #[error("aggregator requires at least one provider")]
    NoProviders,
}

/// Truncate a response body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
