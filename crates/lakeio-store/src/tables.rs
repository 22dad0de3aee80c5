//! Redb table definitions for persistent metadata storage.

use redb::TableDefinition;

// Key: object location (e.g. "lake/meta/0000000000002710_0000000000000002.meta"),
// Value: encoded object bytes
pub const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");
