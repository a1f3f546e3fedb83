pub mod heap;
pub mod index;
pub mod row;
pub mod schema;
pub mod value;

pub use heap::HeapFile;
pub use index::HashIndex;
pub use row::{Row, RowCodec};
pub use schema::{Column, Schema, SchemaStore};
pub use value::{ColumnType, Value};
