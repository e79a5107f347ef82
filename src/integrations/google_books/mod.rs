pub mod client;

pub use client::{GoogleBooksClient, GoogleSeriesInfo, GoogleVolume, GoogleVolumeInfo};
