//! Identity container domain models.
//!
//! A container is an isolated browsing identity with its own storage scope.
//! Containers can claim URLs through glob patterns; matching walks containers in
//! ascending `priority` and the first hit wins.

mod model;

pub use model::{Container, ContainerPatch, ProxyConfig, default_containers};
