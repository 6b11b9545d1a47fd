//! # rookery-api
//!
//! The remote gateway: an async [`Gateway`] trait covering the resource
//! operations the client consumes (statuses, interactions, polls, accounts,
//! timelines) and an HTTP implementation over `reqwest` speaking the
//! Mastodon REST API.
//!
//! OAuth and application registration are out of scope; [`HttpGateway`]
//! takes an already-issued access token.

pub mod error;
pub mod gateway;
pub mod http;
pub mod page;

pub use error::{ApiError, Result};
pub use gateway::{Gateway, NewStatus};
pub use http::{GatewayConfig, HttpGateway};
pub use page::{Page, PageQuery, Paginator, TimelineSource};
