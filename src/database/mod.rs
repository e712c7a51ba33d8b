pub mod assembler;
pub mod manager;
pub mod query_builder;
pub mod record;
pub mod schema;
pub mod slug;

pub use assembler::{Coerce, Fallback, FieldSpec, Projection, WhereClause, WriteSet};
pub use manager::{DatabaseError, DatabaseManager};
pub use query_builder::SqlResult;
pub use record::{parse_list, Record, RecordError};
pub use schema::{ColumnMap, SchemaProbe, SchemaProber, StaticSchema};
pub use slug::{slugify, unique_slug};
