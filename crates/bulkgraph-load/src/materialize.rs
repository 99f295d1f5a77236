//! Row materialization: entity instance to ordered column values.

use bulkgraph_core::{
    BatchColumn, EntityRef, FieldValue, MaterializationError, MaterializationErrorKind, Result,
    SemanticType, Value,
};
use bulkgraph_schema::{MappedColumn, TableMapping};

/// Reads rows for one table mapping over a fixed column set.
pub struct RowMaterializer<'m> {
    mapping: &'m TableMapping,
    columns: Vec<&'m MappedColumn>,
}

impl<'m> RowMaterializer<'m> {
    /// Materialize the insert columns of `mapping`.
    pub fn new(mapping: &'m TableMapping, include_generated: bool) -> Self {
        Self {
            mapping,
            columns: mapping.insert_columns(include_generated),
        }
    }

    pub fn columns(&self) -> &[&'m MappedColumn] {
        &self.columns
    }

    /// The transferred column list, in row order.
    pub fn batch_columns(&self) -> Vec<BatchColumn> {
        self.columns
            .iter()
            .map(|c| c.descriptor.batch_column())
            .collect()
    }

    /// Produce one row for `instance`.
    ///
    /// Either every column yields a value or the whole row fails.
    pub fn materialize(&self, instance: &EntityRef) -> Result<Vec<Value>> {
        let mut row = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            row.push(self.column_value(instance, column)?);
        }
        Ok(row)
    }

    fn column_value(&self, instance: &EntityRef, column: &MappedColumn) -> Result<Value> {
        let descriptor = &column.descriptor;
        let error = |kind, actual| MaterializationError {
            kind,
            entity: self.mapping.entity.name().to_string(),
            table: self.mapping.table.to_string(),
            column: descriptor.name.clone(),
            expected: descriptor.semantic_type,
            actual,
        };

        let Some(field) = column.read(instance) else {
            return Err(error(MaterializationErrorKind::ForeignInstance, None).into());
        };

        let value = match field {
            FieldValue::Unset | FieldValue::Set(Value::Null) => {
                if descriptor.nullable {
                    return Ok(Value::Null);
                }
                return Err(error(MaterializationErrorKind::NullInNonNullable, None).into());
            }
            FieldValue::Set(value) => value,
        };

        coerce(value, descriptor.semantic_type)
            .map_err(|(kind, actual)| error(kind, Some(actual)).into())
    }
}

/// Normalize a non-null value to the column's semantic type.
fn coerce(
    value: Value,
    expected: SemanticType,
) -> std::result::Result<Value, (MaterializationErrorKind, SemanticType)> {
    let Some(actual) = value.semantic_type() else {
        return Ok(value);
    };
    if expected == SemanticType::Other || actual == expected {
        return Ok(value);
    }
    match (expected, value) {
        (SemanticType::Int, Value::BigInt(v)) => i32::try_from(v)
            .map(Value::Int)
            .map_err(|_| (MaterializationErrorKind::OutOfRange, actual)),
        _ => Err((MaterializationErrorKind::TypeMismatch, actual)),
    }
}
