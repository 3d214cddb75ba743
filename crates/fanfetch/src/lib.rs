#![doc = include_str!("../README.md")]

mod app;
mod concurrency;
mod config;
mod dispatcher;
mod error;
mod group;
mod handler;
mod interface;
pub mod memory;
mod message;
mod route;

#[cfg(test)]
mod test_support;

pub use crate::app::*;
pub use crate::concurrency::*;
pub use crate::config::*;
pub use crate::dispatcher::*;
pub use crate::error::*;
pub use crate::group::*;
pub use crate::handler::*;
pub use crate::interface::*;
pub use crate::message::*;
pub use crate::route::*;
