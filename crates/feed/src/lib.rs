//! Order feeds for crossbook
//!
//! Everything around the matching core that touches the outside world:
//!
//! - [`parser`]: the `SIDE SYMBOL QUANTITY PRICE` line format
//! - [`ingest`]: validation into sequenced [`matching_engine::Order`]s
//! - [`generator`]: reproducible synthetic feeds
//! - [`reporter`]: trade output as text or JSON lines

pub mod error;
pub mod generator;
pub mod ingest;
pub mod parser;
pub mod reporter;

pub use error::{FeedError, ValidationError};
pub use generator::{generate, generate_orders, GeneratorConfig, OrderGenerator};
pub use ingest::{ingest, ingest_file, IngestReport, RejectPolicy, Rejection};
pub use parser::{parse_line, parse_side, FeedReader, OrderRecord};
pub use reporter::{format_trade, ReportFormat, TradeReporter};
