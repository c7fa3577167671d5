pub mod router;

pub use router::{CallbackRouter, Completion, PendingCommand};
