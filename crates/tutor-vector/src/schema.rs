use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Row layout of the course-material table; `dim` fixes the vector width.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("filename", DataType::Utf8, false),
		Field::new("filepath", DataType::Utf8, false),
		Field::new("filetype", DataType::Utf8, false),
		Field::new("page_number", DataType::Int32, false),
		Field::new("chunk_id", DataType::Int32, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Width of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
	match schema.field_with_name("vector").ok()?.data_type() {
		DataType::FixedSizeList(_, n) => Some(*n),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vector_width_follows_dim() {
		let schema = build_arrow_schema(8);
		assert_eq!(vector_dim(&schema), Some(8));
		assert_eq!(schema.fields().len(), 8);
	}
}
