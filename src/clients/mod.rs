pub mod remote_service;

pub use remote_service::{HttpRemoteService, RemoteService};
