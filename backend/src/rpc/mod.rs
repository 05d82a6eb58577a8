//! Procedure calls: context, dispatch and the wire envelope.
//!
//! A call is a procedure path (`router.procedure`) plus a JSON input. The
//! dispatcher validates the input, runs the procedure with a [`Context`],
//! and wraps the outcome in an [`Envelope`].

pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod error;

pub use context::{Context, Services, Session};
pub use dispatch::{call_batch, call_procedure, dispatch, refresh_session_user};
pub use envelope::{batch_status, Envelope};
pub use error::{ErrorCode, ErrorShape, ProcedureError, ProcedureResult};
