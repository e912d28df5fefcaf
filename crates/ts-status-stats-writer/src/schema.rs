// Arrow conversion and schema widening for flat records
//
// A record becomes one Arrow row. When rows already exist on disk the column
// set is widened to the union of stored columns and record keys: stored
// columns keep their order, new keys follow in record order, and cells with
// no value are null. Columns whose type disagrees with an incoming value are
// widened (Null -> T, Int64 + Float64 -> Float64, anything else -> Utf8).

use arrow::array::{
    new_null_array, Array, ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch,
    RecordBatchOptions, StringArray,
};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use std::sync::Arc;
use ts_status_stats_core::{FlatRecord, Scalar};

/// Natural Arrow type of a scalar value.
pub(crate) fn scalar_type(value: &Scalar) -> DataType {
    match value {
        Scalar::Null => DataType::Null,
        Scalar::Bool(_) => DataType::Boolean,
        Scalar::Int(_) => DataType::Int64,
        Scalar::Float(_) => DataType::Float64,
        Scalar::String(_) => DataType::Utf8,
    }
}

/// Type that can hold values of both `existing` and `incoming`.
pub(crate) fn widen(existing: &DataType, incoming: &DataType) -> DataType {
    match (existing, incoming) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    }
}

/// Schema for a record with no prior rows.
pub(crate) fn record_schema(record: &FlatRecord) -> Schema {
    Schema::new(
        record
            .iter()
            .map(|(name, value)| Field::new(name, scalar_type(value), true))
            .collect::<Vec<_>>(),
    )
}

/// Union of stored columns and record keys, with widened types.
pub(crate) fn merge_schema(existing: &Schema, record: &FlatRecord) -> Schema {
    let mut fields: Vec<Field> = existing
        .fields()
        .iter()
        .map(|field| {
            let data_type = match record.get(field.name()) {
                Some(value) => widen(field.data_type(), &scalar_type(value)),
                None => field.data_type().clone(),
            };
            Field::new(field.name(), data_type, true)
        })
        .collect();

    for (name, value) in record.iter() {
        if existing.index_of(name).is_err() {
            fields.push(Field::new(name, scalar_type(value), true));
        }
    }

    Schema::new(fields)
}

/// One-row batch holding `record`, shaped to `schema`.
pub(crate) fn record_batch(
    record: &FlatRecord,
    schema: &SchemaRef,
) -> Result<RecordBatch, ArrowError> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| match record.get(field.name()) {
            Some(value) => scalar_array(value, field.data_type()),
            None => Ok(new_null_array(field.data_type(), 1)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    RecordBatch::try_new_with_options(
        schema.clone(),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(1)),
    )
}

/// Reshape a stored batch to `schema`: cast widened columns, null-fill new ones.
pub(crate) fn conform_batch(
    batch: &RecordBatch,
    schema: &SchemaRef,
) -> Result<RecordBatch, ArrowError> {
    let rows = batch.num_rows();
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(column) if column.data_type() == field.data_type() => Ok(column.clone()),
            Some(column) => cast(column.as_ref(), field.data_type()),
            None => Ok(new_null_array(field.data_type(), rows)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    RecordBatch::try_new_with_options(
        schema.clone(),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(rows)),
    )
}

/// Stored rows followed by `record`, as a single batch.
pub(crate) fn append_record(
    existing_schema: &Schema,
    existing: &[RecordBatch],
    record: &FlatRecord,
) -> Result<RecordBatch, ArrowError> {
    let schema: SchemaRef = Arc::new(merge_schema(existing_schema, record));

    let mut batches = existing
        .iter()
        .map(|batch| conform_batch(batch, &schema))
        .collect::<Result<Vec<_>, _>>()?;
    batches.push(record_batch(record, &schema)?);

    concat_batches(&schema, &batches)
}

fn scalar_array(value: &Scalar, data_type: &DataType) -> Result<ArrayRef, ArrowError> {
    let array: ArrayRef = match value {
        Scalar::Null => return Ok(new_null_array(data_type, 1)),
        Scalar::Bool(v) => Arc::new(BooleanArray::from(vec![*v])),
        Scalar::Int(v) => Arc::new(Int64Array::from(vec![*v])),
        Scalar::Float(v) => Arc::new(Float64Array::from(vec![*v])),
        Scalar::String(v) => Arc::new(StringArray::from(vec![v.as_str()])),
    };

    if array.data_type() == data_type {
        Ok(array)
    } else {
        cast(array.as_ref(), data_type)
    }
}
