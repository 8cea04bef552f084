mod models;

pub mod client;

pub use client::{SlskdClient, SlskdClientBuilder};
