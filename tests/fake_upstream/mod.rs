#![allow(dead_code)]

//! Fake upstream API for integration testing
//!
//! An in-process HTTP/1.1 server standing in for the social network: it
//! answers the OAuth endpoints and the direct messages endpoint with
//! canned responses and records every request so tests can check what
//! was signed and sent.
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, request parsing, canned routes
//! - `oauth` -- helpers for checking recorded OAuth requests

pub mod oauth;
mod server;

pub use server::{FakeUpstream, Recorded, Route};
