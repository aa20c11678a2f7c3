pub mod coldstart;
pub mod export;
pub mod http_evaluator;
pub mod wiring;

pub use coldstart::{load_documents, run_cold_start, ColdStartDocument, ColdStartSummary};
pub use export::{default_export_path, export_corpus, write_notes_csv};
pub use http_evaluator::{http_evaluator_set, HttpEvaluator};
pub use wiring::{build_ingestor, connect_graph, graph_store};
