//! UDP capabilities: passive broadcast listening and the active trigger
//! probe. Sockets are scoped to a single call and released on every exit
//! path, including timeout and error.

mod listener;
mod probe;

pub use listener::{DatagramSource, ListenOutcome, ListenerError, listen, listen_with};
pub use probe::{ProbeError, ProbeOutcome, probe};

/// Maximum UDP payload accepted in one datagram. Device replies are short
/// plaintext secrets, so this is generous.
pub(crate) const MAX_DATAGRAM: usize = 2048;
