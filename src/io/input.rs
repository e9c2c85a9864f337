//! JSON measure input.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::measure::MeasureInput;

/// Top-level layout of a measure file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasureFile {
    pub measures: Vec<MeasureInput>,
}

/// Parses measures from a JSON string.
///
/// # Errors
///
/// Returns [`EngineError::Input`] for malformed JSON or unknown fields.
pub fn from_json_str(s: &str) -> Result<Vec<MeasureInput>, EngineError> {
    serde_json::from_str::<MeasureFile>(s)
        .map(|file| file.measures)
        .map_err(|e| EngineError::Input(e.to_string()))
}

/// Parses measures from a JSON file.
///
/// # Errors
///
/// Returns [`EngineError::Input`] if the file cannot be read or parsed.
pub fn from_json_file(path: &Path) -> Result<Vec<MeasureInput>, EngineError> {
    let content = fs::read_to_string(path)
        .map_err(|e| EngineError::Input(format!("cannot read \"{}\": {e}", path.display())))?;
    from_json_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEASURE: &str = r#"{
      "measures": [{
        "definition": {
          "name": "LED troffer",
          "climate_zone": ["AIA_CZ2"],
          "bldg_type": ["small office"],
          "fuel_type": ["electricity"],
          "end_use": ["lighting"],
          "technology": ["T8 F32"],
          "structure_type": ["existing"],
          "product_lifetime": [10.0, 12.0]
        },
        "markets": {
          "Technical potential": {
            "baseline_lifetime": [8.0],
            "contributing": []
          }
        }
      }]
    }"#;

    #[test]
    fn parses_measure_file() {
        let measures = from_json_str(MEASURE);
        assert!(measures.is_ok(), "{:?}", measures.err());
        let measures = measures.unwrap_or_default();
        assert_eq!(measures.len(), 1);
        assert_eq!(measures[0].definition.name, "LED troffer");
        assert_eq!(measures[0].definition.product_lifetime.samples(), Some(2));
        assert_eq!(measures[0].definition.market_entry_year, None);
    }

    #[test]
    fn unknown_field_is_an_input_error() {
        let bad = MEASURE.replace("\"product_lifetime\"", "\"cost_units\": \"$/unit\", \"product_lifetime\"");
        assert!(matches!(from_json_str(&bad), Err(EngineError::Input(_))));
    }

    #[test]
    fn unknown_scheme_is_an_input_error() {
        let bad = MEASURE.replace("Technical potential", "Partial potential");
        assert!(from_json_str(&bad).is_err());
    }

    #[test]
    fn missing_file_reported() {
        let result = from_json_file(Path::new("/nonexistent/measures.json"));
        assert!(result.is_err_and(|e| e.to_string().contains("cannot read")));
    }
}
