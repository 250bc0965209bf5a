use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;

use crate::candle::Candle;
use crate::error::TradesError;

pub fn candle_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("open", DataType::Utf8, false),
        Field::new("high", DataType::Utf8, false),
        Field::new("low", DataType::Utf8, false),
        Field::new("close", DataType::Utf8, false),
        Field::new("volume", DataType::Utf8, false),
    ])
}

pub fn candles_to_record_batch(candles: &[Candle]) -> Result<RecordBatch, TradesError> {
    let schema = Arc::new(candle_schema());

    let timestamps: Vec<i64> = candles
        .iter()
        .map(|c| c.timestamp.timestamp_micros())
        .collect();

    let column_of = |value: fn(&Candle) -> Decimal| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(
            candles.iter().map(|c| value(c).to_string()),
        ))
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        column_of(|c| c.open),
        column_of(|c| c.high),
        column_of(|c| c.low),
        column_of(|c| c.close),
        column_of(|c| c.volume),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn decimal_column<'a>(
    batch: &'a RecordBatch,
    index: usize,
    name: &str,
) -> Result<&'a StringArray, TradesError> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| TradesError::InvalidData(format!("expected {name} column")))
}

fn parse_decimal(column: &StringArray, row: usize, name: &str) -> Result<Decimal, TradesError> {
    column
        .value(row)
        .parse()
        .map_err(|e| TradesError::InvalidData(format!("invalid {name}: {e}")))
}

pub fn record_batch_to_candles(batch: &RecordBatch) -> Result<Vec<Candle>, TradesError> {
    let timestamps = batch
        .column(0)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or_else(|| TradesError::InvalidData("expected timestamp column".into()))?;

    let opens = decimal_column(batch, 1, "open")?;
    let highs = decimal_column(batch, 2, "high")?;
    let lows = decimal_column(batch, 3, "low")?;
    let closes = decimal_column(batch, 4, "close")?;
    let volumes = decimal_column(batch, 5, "volume")?;

    let mut candles = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let micros = timestamps.value(i);
        let timestamp = chrono::DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| TradesError::InvalidData(format!("invalid timestamp: {micros}")))?;

        candles.push(Candle {
            timestamp,
            open: parse_decimal(opens, i, "open")?,
            high: parse_decimal(highs, i, "high")?,
            low: parse_decimal(lows, i, "low")?,
            close: parse_decimal(closes, i, "close")?,
            volume: parse_decimal(volumes, i, "volume")?,
        });
    }

    Ok(candles)
}

pub fn write_parquet(path: &Path, candles: &[Candle]) -> Result<(), TradesError> {
    let batch = candles_to_record_batch(candles)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<Vec<Candle>, TradesError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut all_candles = Vec::new();
    for batch in reader {
        let batch = batch?;
        let mut candles = record_batch_to_candles(&batch)?;
        all_candles.append(&mut candles);
    }

    Ok(all_candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample_candles() -> Vec<Candle> {
        vec![
            Candle {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap(),
                open: dec!(2450.1234),
                high: dec!(2451.5678),
                low: dec!(2449.0001),
                close: dec!(2450.9999),
                volume: dec!(12.5),
            },
            Candle {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 14, 31, 0).unwrap(),
                open: dec!(2450.9999),
                high: dec!(2452.00),
                low: dec!(2450.50),
                close: dec!(2451.75),
                volume: Decimal::ZERO,
            },
        ]
    }

    #[test]
    fn record_batch_roundtrip() {
        let candles = sample_candles();
        let batch = candles_to_record_batch(&candles).unwrap();
        let result = record_batch_to_candles(&batch).unwrap();
        assert_eq!(candles, result);
    }

    #[test]
    fn empty_candles_roundtrip() {
        let candles: Vec<Candle> = vec![];
        let batch = candles_to_record_batch(&candles).unwrap();
        assert_eq!(batch.num_rows(), 0);
        let result = record_batch_to_candles(&batch).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn parquet_file_roundtrip() {
        let candles = sample_candles();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.parquet");

        write_parquet(&path, &candles).unwrap();
        let result = read_parquet(&path).unwrap();
        assert_eq!(candles, result);
    }

    #[test]
    fn decimal_precision_preserved() {
        let candle = Candle {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap(),
            open: dec!(0.000000000123456789),
            high: dec!(200.0000),
            low: dec!(0.0001),
            close: dec!(99999.9999),
            volume: dec!(1234567.891011121314),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precision.parquet");

        write_parquet(&path, &[candle.clone()]).unwrap();
        let result = read_parquet(&path).unwrap();

        assert_eq!(result[0].open, dec!(0.000000000123456789));
        assert_eq!(result[0].high, dec!(200.0000));
        assert_eq!(result[0].low, dec!(0.0001));
        assert_eq!(result[0].close, dec!(99999.9999));
        assert_eq!(result[0].volume, dec!(1234567.891011121314));
    }
}
