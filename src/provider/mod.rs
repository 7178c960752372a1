//! # Cloud Providers

pub mod aws;
