mod announcer;

pub use announcer::*;
