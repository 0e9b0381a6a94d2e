//! Parquet trip sink (feature `parquet`).
//!
//! Same columns as the CSV sink.  `finish()` **must** be called to write the
//! Parquet footer; files closed without it cannot be opened by readers.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{StringBuilder, UInt32Builder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::sink::TripRow;
use crate::IoResult;

fn trip_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("IndID",         DataType::UInt32, false),
        Field::new("LatentClass",   DataType::UInt32, false),
        Field::new("Activity",      DataType::Utf8,   false),
        Field::new("Mode",          DataType::Utf8,   false),
        Field::new("Origin",        DataType::UInt32, false),
        Field::new("Destination",   DataType::UInt32, false),
        Field::new("DepartureTime", DataType::Utf8,   false),
        Field::new("TravelTime",    DataType::UInt32, false),
        Field::new("ArrivalTime",   DataType::Utf8,   false),
    ]))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Writes simulation trips to one Parquet file.
pub struct TripParquetWriter {
    writer: Option<ArrowWriter<File>>,
    schema: Arc<Schema>,
}

impl TripParquetWriter {
    pub fn create(path: &Path) -> IoResult<Self> {
        let schema = trip_schema();
        let file = File::create(path)?;
        let writer = ArrowWriter::try_new(file, Arc::clone(&schema), Some(snappy_props()))?;
        Ok(Self { writer: Some(writer), schema })
    }

    pub fn write_rows(&mut self, rows: &[TripRow]) -> IoResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let mut persons = UInt32Builder::new();
        let mut classes = UInt32Builder::new();
        let mut activities = StringBuilder::new();
        let mut modes = StringBuilder::new();
        let mut origins = UInt32Builder::new();
        let mut dests = UInt32Builder::new();
        let mut departures = StringBuilder::new();
        let mut travel_mins = UInt32Builder::new();
        let mut arrivals = StringBuilder::new();

        for row in rows {
            persons.append_value(row.person);
            classes.append_value(row.latent_class as u32);
            activities.append_value(&row.activity);
            modes.append_value(&row.mode);
            origins.append_value(row.origin);
            dests.append_value(row.dest);
            departures.append_value(&row.departure);
            travel_mins.append_value(row.travel_mins);
            arrivals.append_value(&row.arrival);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&self.schema),
            vec![
                Arc::new(persons.finish()),
                Arc::new(classes.finish()),
                Arc::new(activities.finish()),
                Arc::new(modes.finish()),
                Arc::new(origins.finish()),
                Arc::new(dests.finish()),
                Arc::new(departures.finish()),
                Arc::new(travel_mins.finish()),
                Arc::new(arrivals.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }

    pub fn finish(&mut self) -> IoResult<()> {
        if let Some(writer) = self.writer.take() {
            writer.close()?;
        }
        Ok(())
    }
}
