pub mod core;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod vector_math;

#[cfg(test)]
mod testing;
