pub mod validated;

// Re-export commonly used extractors
pub use validated::{ValidBody, ValidParams, ValidQuery};
