//! Target column coercion
//!
//! The `pago` column arrives in whatever shape the export produced: integers,
//! floats, booleans, numeric strings, blanks or garbage. It is coerced to a
//! strict 0/1 byte. Values that cannot be read as a number become 0; this is
//! policy, not failure.

use polars::prelude::*;

/// Coerce an already-numeric target value to 0/1.
///
/// The value is truncated toward zero first, so `0.7` reads as 0 and `1.9`
/// as 1. Any positive truncated value is an event; NaN, zero and negatives
/// are non-events.
pub fn coerce_numeric_target(value: Option<f64>) -> u8 {
    match value {
        Some(v) if v.is_finite() && v.trunc() > 0.0 => 1,
        _ => 0,
    }
}

/// Coerce a raw textual target value to 0/1.
pub fn coerce_target_value(raw: Option<&str>) -> u8 {
    let parsed = raw.and_then(|s| s.trim().parse::<f64>().ok());
    coerce_numeric_target(parsed)
}

/// Coerce a whole target column to 0/1, one entry per row.
pub fn coerce_target_column(col: &Column) -> PolarsResult<Vec<u8>> {
    if col.dtype().is_primitive_numeric() {
        let cast = col.cast(&DataType::Float64)?;
        return Ok(cast.f64()?.into_iter().map(coerce_numeric_target).collect());
    }

    if col.dtype() == &DataType::Boolean {
        return Ok(col
            .bool()?
            .into_iter()
            .map(|v| u8::from(v.unwrap_or(false)))
            .collect());
    }

    let values = column_to_string_vec(col)?;
    Ok(values
        .iter()
        .map(|v| coerce_target_value(v.as_deref()))
        .collect())
}

/// Convert a column to a Vec of Option<String>, preserving nulls
pub(crate) fn column_to_string_vec(col: &Column) -> PolarsResult<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        DataType::Null => vec![None; col.len()],
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_textual_values() {
        assert_eq!(coerce_target_value(Some("1")), 1);
        assert_eq!(coerce_target_value(Some("0")), 0);
        assert_eq!(coerce_target_value(Some(" 1 ")), 1);
        assert_eq!(coerce_target_value(Some("1.0")), 1);
        assert_eq!(coerce_target_value(Some("")), 0);
        assert_eq!(coerce_target_value(Some("sí")), 0);
        assert_eq!(coerce_target_value(Some("NaN")), 0);
        assert_eq!(coerce_target_value(None), 0);
    }

    #[test]
    fn test_coerce_numeric_truncates() {
        assert_eq!(coerce_numeric_target(Some(1.0)), 1);
        assert_eq!(coerce_numeric_target(Some(0.0)), 0);
        assert_eq!(coerce_numeric_target(Some(0.7)), 0);
        assert_eq!(coerce_numeric_target(Some(2.0)), 1);
        assert_eq!(coerce_numeric_target(Some(-1.0)), 0);
        assert_eq!(coerce_numeric_target(Some(f64::NAN)), 0);
        assert_eq!(coerce_numeric_target(None), 0);
    }

    #[test]
    fn test_coerce_integer_column() {
        let col = Column::new("pago".into(), [Some(1i64), Some(0), None, Some(1)]);
        assert_eq!(coerce_target_column(&col).unwrap(), vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_coerce_string_column() {
        let col = Column::new(
            "pago".into(),
            [Some("1"), Some("0"), Some("abc"), None, Some("")],
        );
        assert_eq!(coerce_target_column(&col).unwrap(), vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_coerce_boolean_column() {
        let col = Column::new("pago".into(), [Some(true), Some(false), None]);
        assert_eq!(coerce_target_column(&col).unwrap(), vec![1, 0, 0]);
    }

    #[test]
    fn test_string_vec_preserves_nulls() {
        let col = Column::new("x".into(), [Some(513810i64), None]);
        let values = column_to_string_vec(&col).unwrap();
        assert_eq!(values, vec![Some("513810".to_string()), None]);
    }
}
