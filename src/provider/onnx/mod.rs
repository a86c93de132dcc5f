//! ONNX Runtime backends for the tokenizer and model sessions.

pub mod model;
pub mod session;
pub mod tokenizer;

pub use model::OnnxModelSession;
pub use session::{create_model_session, create_tokenizer_session};
pub use tokenizer::OnnxTokenizerSession;
