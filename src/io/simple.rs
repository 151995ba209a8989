//! The simple JSON representation: the canonical serde_json serialization of the `Payload` as input and of the
//! `Outcome` as output.

use crate::{Outcome, Payload};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

/// Read the rotation problem payload from its JSON representation.
///
/// The payload is only parsed here, not validated (see `Payload::validate()`).
pub fn read<R: std::io::Read>(reader: R) -> Result<Payload, String> {
    serde_json::from_reader(reader).map_err(|e| format!("{}", e))
}

/// Write the solved rotation (or `null`, if no solution was found) as simple JSON representation to a Writer (e.g. an
/// output file).
pub fn write<W: std::io::Write>(writer: W, outcome: Option<&Outcome>) -> Result<(), String> {
    let solution: serde_json::Value = serde_json::to_value(outcome).map_err(|e| format!("{}", e))?;
    let data = json!({
        "format": "X-rotation-simple",
        "version": "1.0",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
        "solution": solution
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}
