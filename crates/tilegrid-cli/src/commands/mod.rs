pub mod ingest;
pub mod list;
