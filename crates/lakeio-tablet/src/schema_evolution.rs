//! Schema evolution
//!
//! Builds the schema of a new tablet, either from an explicit column list or
//! by deriving it from the schema of a base tablet. Derivation keys columns
//! by name: a column that keeps its name keeps its unique id, a new name gets
//! a fresh id from the base schema's counter, and dropped ids are never
//! handed out again.

use lakeio_common::{
    Column, ColumnUid, Error, KeysType, Result, SchemaDescriptor, SchemaId, validate_columns,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A requested column. `unique_id` is only honored for explicit creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(default)]
    pub unique_id: Option<ColumnUid>,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_unique_id(mut self, unique_id: ColumnUid) -> Self {
        self.unique_id = Some(unique_id);
        self
    }

    #[must_use]
    pub const fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    fn to_column(&self, unique_id: ColumnUid) -> Column {
        Column {
            unique_id,
            name: self.name.clone(),
            column_type: self.column_type.clone(),
            is_key: self.is_key,
            is_nullable: self.is_nullable,
            default_value: self.default_value.clone(),
        }
    }
}

/// The schema part of a tablet creation request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Schema (index) id of the new schema
    pub id: SchemaId,
    #[serde(default)]
    pub keys_type: KeysType,
    #[serde(default)]
    pub num_short_key_columns: u32,
    pub columns: Vec<ColumnSpec>,
}

impl SchemaSpec {
    pub fn new(id: SchemaId, columns: Vec<ColumnSpec>) -> Self {
        Self {
            id,
            columns,
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_keys_type(mut self, keys_type: KeysType) -> Self {
        self.keys_type = keys_type;
        self
    }
}

/// The id after `id`, or `InvalidArgument` once the id space is exhausted
fn successor(id: ColumnUid) -> Result<ColumnUid> {
    id.checked_add(1)
        .ok_or_else(|| Error::invalid_argument(format!("column unique id {id} has no successor")))
}

/// Hand out `*next` and advance it
fn allocate(next: &mut ColumnUid) -> Result<ColumnUid> {
    let id = *next;
    *next = successor(id)?;
    Ok(id)
}

/// Build a schema from an explicit column list.
///
/// Provided ids are kept; columns without one get ids above the largest
/// provided id, in request order. The result is schema version 0.
pub fn build_schema(spec: &SchemaSpec) -> Result<SchemaDescriptor> {
    validate_columns(spec.columns.iter().map(|c| (c.unique_id, c.name.as_str())))?;

    let mut next = match spec.columns.iter().filter_map(|c| c.unique_id).max() {
        Some(max) => successor(max)?,
        None => 0,
    };
    let columns = spec
        .columns
        .iter()
        .map(|c| {
            let unique_id = match c.unique_id {
                Some(id) => id,
                None => allocate(&mut next)?,
            };
            Ok(c.to_column(unique_id))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SchemaDescriptor {
        id: spec.id,
        schema_version: 0,
        keys_type: spec.keys_type,
        num_short_key_columns: spec.num_short_key_columns,
        columns,
        next_column_unique_id: next,
    })
}

/// Derive a new schema from `base` and the requested column list.
///
/// Request-supplied ids are ignored; identity comes from the base schema.
pub fn evolve(base: &SchemaDescriptor, spec: &SchemaSpec) -> Result<SchemaDescriptor> {
    validate_columns(spec.columns.iter().map(|c| (None, c.name.as_str())))?;

    let by_name: HashMap<&str, &Column> =
        base.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let mut next = base.next_column_unique_id;
    let columns: Vec<Column> = spec
        .columns
        .iter()
        .map(|c| {
            let unique_id = match by_name.get(c.name.as_str()) {
                Some(existing) => existing.unique_id,
                None => allocate(&mut next)?,
            };
            Ok(c.to_column(unique_id))
        })
        .collect::<Result<_>>()?;

    // Never move the counter backwards, even when the highest ids were dropped
    let mut next_column_unique_id = next;
    for column in &columns {
        next_column_unique_id = next_column_unique_id.max(successor(column.unique_id)?);
    }

    Ok(SchemaDescriptor {
        id: spec.id,
        schema_version: base.schema_version + 1,
        keys_type: spec.keys_type,
        num_short_key_columns: spec.num_short_key_columns,
        columns,
        next_column_unique_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SchemaDescriptor {
        SchemaDescriptor::with_columns(
            100,
            vec![Column::new(0, "c0", "INT").key(), Column::new(1, "c1", "INT")],
        )
    }

    fn ids(schema: &SchemaDescriptor) -> Vec<(&str, ColumnUid)> {
        schema
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.unique_id))
            .collect()
    }

    #[test]
    fn test_evolve_add_column_in_request_order() {
        let spec = SchemaSpec::new(
            101,
            vec![
                ColumnSpec::new("c0", "INT").key(),
                ColumnSpec::new("c3", "BIGINT"),
                ColumnSpec::new("c1", "INT"),
            ],
        );
        let evolved = evolve(&base(), &spec).unwrap();
        assert_eq!(ids(&evolved), vec![("c0", 0), ("c3", 2), ("c1", 1)]);
        assert_eq!(evolved.next_column_unique_id, 3);
        assert_eq!(evolved.schema_version, 1);
        assert_eq!(evolved.id, 101);
        evolved.validate().unwrap();
    }

    #[test]
    fn test_evolve_drop_never_reuses_id() {
        let first = evolve(
            &base(),
            &SchemaSpec::new(
                101,
                vec![
                    ColumnSpec::new("c0", "INT").key(),
                    ColumnSpec::new("c3", "BIGINT"),
                    ColumnSpec::new("c1", "INT"),
                ],
            ),
        )
        .unwrap();

        let second = evolve(
            &first,
            &SchemaSpec::new(
                102,
                vec![ColumnSpec::new("c0", "INT").key(), ColumnSpec::new("c3", "BIGINT")],
            ),
        )
        .unwrap();
        assert_eq!(ids(&second), vec![("c0", 0), ("c3", 2)]);
        assert_eq!(second.next_column_unique_id, 3);
        assert_eq!(second.schema_version, 2);

        // Re-adding a dropped name is a new column with a new id
        let third = evolve(
            &second,
            &SchemaSpec::new(
                103,
                vec![
                    ColumnSpec::new("c0", "INT").key(),
                    ColumnSpec::new("c3", "BIGINT"),
                    ColumnSpec::new("c1", "INT"),
                ],
            ),
        )
        .unwrap();
        assert_eq!(third.column_by_name("c1").unwrap().unique_id, 3);
        assert_eq!(third.next_column_unique_id, 4);
    }

    #[test]
    fn test_evolve_merges_attributes() {
        let spec = SchemaSpec::new(
            101,
            vec![
                ColumnSpec::new("c0", "INT").key(),
                ColumnSpec::new("c1", "BIGINT").nullable().with_default("0"),
            ],
        );
        let evolved = evolve(&base(), &spec).unwrap();
        let c1 = evolved.column_by_name("c1").unwrap();
        assert_eq!(c1.unique_id, 1);
        assert_eq!(c1.column_type, "BIGINT");
        assert!(c1.is_nullable);
        assert_eq!(c1.default_value.as_deref(), Some("0"));
    }

    #[test]
    fn test_evolve_ignores_requested_ids() {
        let spec = SchemaSpec::new(
            101,
            vec![
                ColumnSpec::new("c1", "INT").with_unique_id(0),
                ColumnSpec::new("c0", "INT").with_unique_id(0),
            ],
        );
        let evolved = evolve(&base(), &spec).unwrap();
        assert_eq!(ids(&evolved), vec![("c1", 1), ("c0", 0)]);
    }

    #[test]
    fn test_evolve_duplicate_name() {
        let spec = SchemaSpec::new(
            101,
            vec![ColumnSpec::new("c0", "INT"), ColumnSpec::new("c0", "BIGINT")],
        );
        let err = evolve(&base(), &spec).unwrap_err();
        assert!(err.to_string().contains("Duplicate column name"));
    }

    #[test]
    fn test_build_schema_explicit_ids() {
        let spec = SchemaSpec::new(
            7,
            vec![
                ColumnSpec::new("c0", "INT").with_unique_id(0).key(),
                ColumnSpec::new("c1", "INT").with_unique_id(5),
            ],
        )
        .with_keys_type(KeysType::PrimaryKeys);
        let schema = build_schema(&spec).unwrap();
        assert_eq!(schema.schema_version, 0);
        assert_eq!(schema.next_column_unique_id, 6);
        assert_eq!(schema.keys_type, KeysType::PrimaryKeys);
        schema.validate().unwrap();
    }

    #[test]
    fn test_build_schema_assigns_missing_ids() {
        let spec = SchemaSpec::new(
            7,
            vec![
                ColumnSpec::new("a", "INT"),
                ColumnSpec::new("b", "INT").with_unique_id(3),
                ColumnSpec::new("c", "INT"),
            ],
        );
        let schema = build_schema(&spec).unwrap();
        assert_eq!(
            schema.columns.iter().map(|c| c.unique_id).collect::<Vec<_>>(),
            vec![4, 3, 5]
        );
        assert_eq!(schema.next_column_unique_id, 6);
    }

    #[test]
    fn test_build_schema_duplicates() {
        let spec = SchemaSpec::new(
            7,
            vec![
                ColumnSpec::new("c0", "INT").with_unique_id(0),
                ColumnSpec::new("c1", "INT").with_unique_id(0),
            ],
        );
        assert!(build_schema(&spec).unwrap_err().to_string().contains("Duplicate column id"));

        let spec = SchemaSpec::new(
            7,
            vec![
                ColumnSpec::new("c0", "INT").with_unique_id(0),
                ColumnSpec::new("c0", "INT").with_unique_id(1),
            ],
        );
        assert!(build_schema(&spec).unwrap_err().to_string().contains("Duplicate column name"));
    }

    #[test]
    fn test_column_id_overflow() {
        let spec = SchemaSpec::new(7, vec![ColumnSpec::new("c0", "INT").with_unique_id(u32::MAX)]);
        assert!(build_schema(&spec).unwrap_err().is_invalid_argument());

        let spec = SchemaSpec::new(
            7,
            vec![
                ColumnSpec::new("c0", "INT").with_unique_id(u32::MAX - 1),
                ColumnSpec::new("c1", "INT"),
            ],
        );
        assert!(build_schema(&spec).unwrap_err().is_invalid_argument());

        let mut exhausted = base();
        exhausted.next_column_unique_id = u32::MAX;
        let spec = SchemaSpec::new(
            101,
            vec![ColumnSpec::new("c0", "INT").key(), ColumnSpec::new("c9", "INT")],
        );
        assert!(evolve(&exhausted, &spec).unwrap_err().is_invalid_argument());
    }
}
