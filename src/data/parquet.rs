//! Parquet file writer with rotation, and a reader for offline commands

use super::StoreError;
use crate::analytics::OhlcBar;
use crate::feed::Tick;
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn timestamp_field() -> Field {
    Field::new(
        "timestamp",
        DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
        false,
    )
}

/// Raw tick schema
pub fn tick_schema() -> Schema {
    Schema::new(vec![
        timestamp_field(),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("price", DataType::Float64, false),
        Field::new("quantity", DataType::Float64, false),
    ])
}

/// OHLC bar schema
pub fn ohlc_schema() -> Schema {
    Schema::new(vec![
        timestamp_field(),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("open", DataType::Float64, false),
        Field::new("high", DataType::Float64, false),
        Field::new("low", DataType::Float64, false),
        Field::new("close", DataType::Float64, false),
        Field::new("volume", DataType::Float64, false),
    ])
}

/// Build a record batch of ticks
pub fn ticks_to_batch(ticks: &[Tick]) -> Result<RecordBatch, StoreError> {
    let timestamps: Vec<i64> = ticks.iter().map(|t| t.timestamp).collect();
    let symbols: Vec<&str> = ticks.iter().map(|t| t.symbol.as_str()).collect();
    let prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
    let quantities: Vec<f64> = ticks.iter().map(|t| t.quantity).collect();

    let batch = RecordBatch::try_new(
        Arc::new(tick_schema()),
        vec![
            Arc::new(TimestampMillisecondArray::from(timestamps).with_timezone("UTC")) as ArrayRef,
            Arc::new(StringArray::from(symbols)) as ArrayRef,
            Arc::new(Float64Array::from(prices)) as ArrayRef,
            Arc::new(Float64Array::from(quantities)) as ArrayRef,
        ],
    )?;
    Ok(batch)
}

/// Build a record batch of OHLC bars
pub fn ohlc_to_batch(bars: &[OhlcBar]) -> Result<RecordBatch, StoreError> {
    let values = |f: fn(&OhlcBar) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(bars.iter().map(f).collect::<Vec<_>>()))
    };
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();
    let symbols: Vec<&str> = bars.iter().map(|b| b.symbol.as_str()).collect();

    let batch = RecordBatch::try_new(
        Arc::new(ohlc_schema()),
        vec![
            Arc::new(TimestampMillisecondArray::from(timestamps).with_timezone("UTC")) as ArrayRef,
            Arc::new(StringArray::from(symbols)) as ArrayRef,
            values(|b| b.open),
            values(|b| b.high),
            values(|b| b.low),
            values(|b| b.close),
            values(|b| b.volume),
        ],
    )?;
    Ok(batch)
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Write a complete tick file in one shot
pub fn write_ticks(path: &Path, ticks: &[Tick]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, Arc::new(tick_schema()), Some(writer_properties()))?;
    writer.write(&ticks_to_batch(ticks)?)?;
    writer.close()?;
    Ok(())
}

struct OpenFile {
    path: PathBuf,
    writer: ArrowWriter<File>,
}

/// Appends record batches to time-rotated Parquet files sharing one prefix.
///
/// A file only becomes readable once it is closed, which happens on rotation,
/// on [`ParquetWriter::close`], and on [`ParquetWriter::remove_files`].
pub struct ParquetWriter {
    output_dir: PathBuf,
    prefix: &'static str,
    schema: SchemaRef,
    rotation_interval: Duration,
    current_file_start: Option<DateTime<Utc>>,
    current: Option<OpenFile>,
    written: Vec<PathBuf>,
}

impl ParquetWriter {
    /// Create a new Parquet writer
    pub fn new(
        output_dir: PathBuf,
        prefix: &'static str,
        schema: Schema,
        rotation_interval_secs: u64,
    ) -> Self {
        Self {
            output_dir,
            prefix,
            schema: Arc::new(schema),
            rotation_interval: Duration::seconds(rotation_interval_secs as i64),
            current_file_start: None,
            current: None,
            written: Vec::new(),
        }
    }

    /// Check if rotation is needed based on current time
    pub fn needs_rotation(&self, now: DateTime<Utc>) -> bool {
        match self.current_file_start {
            None => true,
            Some(start) => now - start >= self.rotation_interval,
        }
    }

    /// Generate file path for a given timestamp
    pub fn file_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        let filename = format!(
            "{}_{}.parquet",
            self.prefix,
            timestamp.format("%Y%m%d_%H%M%S")
        );
        self.output_dir.join(filename)
    }

    /// Files this writer has created, including the one still open
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    /// Append a batch, rotating to a new file first if the interval elapsed
    pub fn write_batch(&mut self, batch: &RecordBatch, now: DateTime<Utc>) -> Result<(), StoreError> {
        if batch.num_rows() == 0 {
            return Ok(());
        }

        if self.current.is_none() || self.needs_rotation(now) {
            self.close()?;
            fs::create_dir_all(&self.output_dir)?;
            let path = self.file_path(now);
            let file = File::create(&path)?;
            let writer =
                ArrowWriter::try_new(file, Arc::clone(&self.schema), Some(writer_properties()))?;
            tracing::debug!(path = ?path, "Opened Parquet file");
            self.written.push(path.clone());
            self.current = Some(OpenFile { path, writer });
            self.current_file_start = Some(now);
        }

        if let Some(open) = self.current.as_mut() {
            open.writer.write(batch)?;
            open.writer.flush()?;
        }
        Ok(())
    }

    /// Close the current file, writing its footer
    pub fn close(&mut self) -> Result<(), StoreError> {
        if let Some(open) = self.current.take() {
            open.writer.close()?;
            tracing::debug!(path = ?open.path, "Closed Parquet file");
        }
        self.current_file_start = None;
        Ok(())
    }

    /// Close and delete every file this writer created; returns how many were removed
    pub fn remove_files(&mut self) -> Result<usize, StoreError> {
        self.close()?;
        let mut removed = 0;
        for path in self.written.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

/// Reader for Parquet files
pub struct ParquetReader {
    path: PathBuf,
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, idx: usize, name: &str) -> Result<&'a T, StoreError> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::InvalidColumn(name.to_string()))
}

impl ParquetReader {
    /// Create a new reader for a Parquet file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn batches(&self) -> Result<Vec<RecordBatch>, StoreError> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch?);
        }
        Ok(batches)
    }

    /// Read ticks in file order
    pub fn read_ticks(&self) -> Result<Vec<Tick>, StoreError> {
        let mut ticks = Vec::new();
        for batch in self.batches()? {
            let timestamps = column::<TimestampMillisecondArray>(&batch, 0, "timestamp")?;
            let symbols = column::<StringArray>(&batch, 1, "symbol")?;
            let prices = column::<Float64Array>(&batch, 2, "price")?;
            let quantities = column::<Float64Array>(&batch, 3, "quantity")?;

            for i in 0..batch.num_rows() {
                ticks.push(Tick::new(
                    timestamps.value(i),
                    symbols.value(i),
                    prices.value(i),
                    quantities.value(i),
                ));
            }
        }
        Ok(ticks)
    }

    /// Read OHLC bars in file order
    pub fn read_ohlc(&self) -> Result<Vec<OhlcBar>, StoreError> {
        let mut bars = Vec::new();
        for batch in self.batches()? {
            let timestamps = column::<TimestampMillisecondArray>(&batch, 0, "timestamp")?;
            let symbols = column::<StringArray>(&batch, 1, "symbol")?;
            let open = column::<Float64Array>(&batch, 2, "open")?;
            let high = column::<Float64Array>(&batch, 3, "high")?;
            let low = column::<Float64Array>(&batch, 4, "low")?;
            let close = column::<Float64Array>(&batch, 5, "close")?;
            let volume = column::<Float64Array>(&batch, 6, "volume")?;

            for i in 0..batch.num_rows() {
                bars.push(OhlcBar {
                    timestamp: timestamps.value(i),
                    symbol: symbols.value(i).to_string(),
                    open: open.value(i),
                    high: high.value(i),
                    low: low.value(i),
                    close: close.value(i),
                    volume: volume.value(i),
                });
            }
        }
        Ok(bars)
    }
}
