/// Errors from talking to a payment provider.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("Payment provider error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider-supplied message, or the raw body when none was given.
        message: String,
    },

    /// The provider answered with something we could not interpret.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}
