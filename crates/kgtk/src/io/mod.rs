//! Streaming input and output for KGTK files.

pub mod cache;
pub mod columns;
pub mod compression;
pub mod options;
pub mod reader;
pub mod writer;

pub use cache::{GraphCache, FILTER_BATCH_SIZE};
pub use columns::{FileClass, KgtkColumns};
pub use compression::{open_line_source, CompressionType};
pub use options::{
    GraphCacheConfig, InputFormat, KgtkFileMode, ReaderOptions, ValidationAction,
};
pub use reader::{KgtkReader, ReadSummary};
pub use writer::{KgtkWriter, ShapePolicy, WriterFormat};
