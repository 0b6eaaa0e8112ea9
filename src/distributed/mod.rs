//! Controller/walker message passing
//!
//! # Architecture
//!
//! randwalk uses a fixed controller-walker topology:
//!
//! - **Controller** (rank 0): listens for walker connections, receives one report per walker
//! - **Walkers** (ranks 1..N): connect, run their walk, send a single report
//!
//! # Modules
//!
//! - `protocol`: Message definitions and framing
//! - `transport`: Sender/receiver traits and the in-process channel transport
//! - `tcp`: TCP transport used between processes

pub mod protocol;
pub mod tcp;
pub mod transport;

// Re-export key types
pub use protocol::{HelloMessage, Message, ReportMessage, PROTOCOL_VERSION, REPORT_TAG};
pub use tcp::{TcpReportListener, TcpReportSender};
pub use transport::{CompletionReport, ReportReceiver, ReportSender, Received};
