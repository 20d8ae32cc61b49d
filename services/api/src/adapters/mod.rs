pub mod db;
pub mod local_storage;
pub mod solver_llm;

pub use db::DbAdapter;
pub use local_storage::LocalObjectStore;
pub use solver_llm::OpenAiSolverAdapter;
