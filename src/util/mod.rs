pub mod html;
pub mod ollama;
