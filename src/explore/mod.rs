//! Explore
//!
//! Everything behind the query-builder UI:
//!
//! - **Schema introspection**: databases, tables and fields from `system` tables
//! - **Query building**: structured requests rendered to parameterized SQL
//! - **Row decoding**: one type-tag driven decode policy for every result
//! - **Raw SQL**: read-only statements passed through a prefix blocklist
//! - **Autocomplete**: lexical keyword/table/column suggestions
//!
//! # Example
//!
//! ```ignore
//! let service = ExploreService::new(engine, &ExploreConfig::default());
//! let response = service
//!     .execute(&ExploreRequest::new("default", "otel_logs").aggregate("count"))
//!     .await?;
//! ```

pub mod autocomplete;
pub mod builder;
pub mod decoder;
pub mod error;
pub mod gateway;
pub mod model;
pub mod schema;
pub mod service;

pub use autocomplete::{AutocompleteSuggestion, Autocompleter, SuggestionKind};
pub use builder::{BuiltQuery, QueryBuilder};
pub use decoder::{DecodeError, DecodedResult, DecodedRow, DecodedValue, RowDecoder};
pub use error::{ExploreError, ExploreResult};
pub use gateway::SqlGateway;
pub use model::{Aggregate, ExploreRequest, ExploreResponse, ExploreSpec, FilterOp, OrderDir};
pub use schema::{SchemaIntrospector, TableField};
pub use service::ExploreService;
