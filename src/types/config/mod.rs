pub mod chain;
pub mod compression;
pub mod database;
pub mod indexer;
pub mod publish;
pub mod queue;
