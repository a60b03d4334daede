mod client;
mod dto;

pub use client::RestClient;
