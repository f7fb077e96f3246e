pub use rendezvous_core::PeerId;
pub use rendezvous_core::codec;

pub mod model {
    pub use rendezvous_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use rendezvous_server::*;
}
