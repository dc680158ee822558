//! Arrow IPC encoding.

use arrow::ipc::writer::{FileWriter, StreamWriter};
use arrow::record_batch::RecordBatch;

use crate::error::ArrowPlaneError;

/// Encode batches as concatenated IPC stream segments.
///
/// Each declared batch has its own schema, so each becomes one
/// EOS-terminated stream segment; segments appear in declaration order and
/// a reader consumes them with repeated stream readers.
pub fn encode_stream(batches: &[RecordBatch]) -> Result<Vec<u8>, ArrowPlaneError> {
    let mut out = Vec::new();
    for batch in batches {
        let mut writer = StreamWriter::try_new(&mut out, &batch.schema())?;
        writer.write(batch)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Encode batches as concatenated IPC file segments
/// (`application/vnd.apache.arrow.file`).
pub fn encode_file(batches: &[RecordBatch]) -> Result<Vec<u8>, ArrowPlaneError> {
    let mut out = Vec::new();
    for batch in batches {
        let mut writer = FileWriter::try_new(&mut out, &batch.schema())?;
        writer.write(batch)?;
        writer.finish()?;
    }
    Ok(out)
}
