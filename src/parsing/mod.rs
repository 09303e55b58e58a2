pub mod behavior;
pub mod capture;
pub mod language;
pub mod parser;
pub mod paths;
pub mod queries;

pub use behavior::{behavior_for, FileSet, LanguageBehavior};
pub use capture::{CaptureCategory, CaptureEntity, NormalizedCapture};
pub use language::{Language, SUPPORTED_LANGUAGES};
pub use parser::QuerySet;
