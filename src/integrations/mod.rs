// src/integrations/mod.rs
//
// External Integrations Module
//
// Bibliographic catalogs and the text-generation collaborator. Clients
// return DTOs or errors; the lookup layer in services turns them into
// detections.

pub mod google_books;
pub mod http;
pub mod llm;
pub mod open_library;

pub use google_books::GoogleBooksClient;
pub use llm::{OpenAiCompatibleClient, TextGenerator};
pub use open_library::OpenLibraryClient;
