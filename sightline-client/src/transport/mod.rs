mod peer_connection;

pub use peer_connection::*;
