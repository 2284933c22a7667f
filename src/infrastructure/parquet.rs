// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::repositories::storage_repository::StorageError;

pub const PARQUET_CONTENT_TYPE: &str = "application/parquet";

/// 单行记录，列名到字符串值
pub type ParquetRow = BTreeMap<String, Option<String>>;

fn encoding_error(err: impl std::fmt::Display) -> StorageError {
    StorageError::Encoding(err.to_string())
}

/// 字段值的规范字符串形式，空值保持为空
fn canonical(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// 把一条记录编码为单行 Parquet 文件
///
/// 每个字段一列，列类型均为可空 UTF-8
///
/// # 参数
///
/// * `record` - 可序列化为 JSON 对象的记录
///
/// # 返回值
///
/// * `Ok(Vec<u8>)` - Parquet 文件内容
/// * `Err(StorageError)` - 记录不是对象或编码失败
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>, StorageError> {
    let Value::Object(map) = serde_json::to_value(record).map_err(encoding_error)? else {
        return Err(StorageError::Encoding(
            "record must serialize to an object".to_string(),
        ));
    };

    let fields: Vec<Field> = map
        .keys()
        .map(|name| Field::new(name.as_str(), DataType::Utf8, true))
        .collect();
    let columns: Vec<ArrayRef> = map
        .values()
        .map(|value| Arc::new(StringArray::from(vec![canonical(value)])) as ArrayRef)
        .collect();

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).map_err(encoding_error)?;

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).map_err(encoding_error)?;
    writer.write(&batch).map_err(encoding_error)?;
    writer.close().map_err(encoding_error)?;

    Ok(buffer)
}

/// 读取单行 Parquet 文件
pub fn decode_row(body: Vec<u8>) -> Result<ParquetRow, StorageError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(body))
        .map_err(encoding_error)?
        .build()
        .map_err(encoding_error)?;

    let mut row = ParquetRow::new();
    for batch in reader {
        let batch = batch.map_err(encoding_error)?;
        if batch.num_rows() == 0 {
            continue;
        }
        for (index, field) in batch.schema().fields().iter().enumerate() {
            let column = batch
                .column(index)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    StorageError::Encoding(format!("column {} is not utf8", field.name()))
                })?;
            let value = (!column.is_null(0)).then(|| column.value(0).to_string());
            row.insert(field.name().clone(), value);
        }
    }

    Ok(row)
}
