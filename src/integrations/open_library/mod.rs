pub mod client;

pub use client::{OpenLibraryClient, OpenLibraryEdition, OpenLibrarySearchDoc};
