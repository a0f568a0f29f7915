pub mod book;
pub mod jsonl;

pub use book::{Book, BookChanges, BookFilter};
pub use jsonl::{DuplicateId, JsonlStorage};
