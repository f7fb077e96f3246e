mod dispatcher;
mod registry;

pub use dispatcher::*;
pub use registry::{HandleState, PeerRegistry};
