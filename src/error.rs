use thiserror::Error;

/// Error taxonomy for control-path operations.
///
/// Data-path operations (`cmx_receive`, `cmx_send`, `cmx_transmit`) do not
/// surface these to callers except for `InvalidArgument` on an unknown
/// channel id — overload and backpressure are logged and handled in place,
/// per the propagation policy in the design notes.
#[derive(Debug, Error)]
pub enum CmxError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    #[error("busy: {0}")]
    Busy(&'static str),

    #[error("internal inconsistency: {0}")]
    Internal(&'static str),
}
