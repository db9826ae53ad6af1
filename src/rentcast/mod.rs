pub mod client;
pub mod raw;

pub use client::{RentcastClient, DEFAULT_BASE_URL};
