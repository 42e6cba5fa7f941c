//! Networking for oxidized-cheevos
//!
//! The session client owns a queue of outbound requests serviced by
//! background workers. Completed results are parked on a completion queue
//! and handed to the owner thread only when it polls.

pub mod client;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::{Completion, SessionClient};
pub use protocol::ApiUrls;
pub use session::Session;
pub use transport::{HttpRequest, HttpResponse, Transport, HTTP_OK};
