//! Error types for the slotline client

use thiserror::Error;

/// Result type alias for slotline operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors surfaced by the cluster client.
///
/// Transient transport failures and MOVED/ASK redirections are handled
/// inside the dispatch loop and only escape as [`ClusterError::TooManyRedirections`]
/// once the redirection budget is exhausted.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Every startup node failed during topology bootstrap
    #[error("unable to reach any startup node")]
    StartupNodesUnreachable,

    /// Random-node fallback ran out of candidates
    #[error("unable to reach any cluster node (last error: {last})")]
    NoReachableNode { last: String },

    /// The command carries no key to route on
    #[error("command has no routable key")]
    Unroutable,

    /// Keys of a multi-key command hash to different slots
    #[error("keys hash to different slots ({first} vs {other})")]
    CrossSlots { first: u16, other: u16 },

    /// Redirection budget exhausted without a successful reply
    #[error("too many cluster redirections (last error: {last})")]
    TooManyRedirections { last: String },

    /// Error reply from the server that is not a redirection
    #[error("server error: {0}")]
    Server(String),

    /// Malformed wire data
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying transport error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Connect or round-trip deadline exceeded
    #[error("operation timed out")]
    Timeout,

    /// The peer closed the connection mid-exchange
    #[error("server disconnected")]
    Disconnected,

    /// DNS resolution failed for a node
    #[error("dns resolution failed for {0}")]
    Dns(String),

    /// Reply frame had an unexpected shape for the issued command
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ClusterError {
    /// Whether this error indicates node unavailability rather than a
    /// server-side verdict. Transient errors trigger the random-node
    /// fallback inside the dispatch loop instead of surfacing.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(
            self,
            ClusterError::Io(_)
                | ClusterError::Timeout
                | ClusterError::Disconnected
                | ClusterError::Protocol(_)
        )
    }
}
