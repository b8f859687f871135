//! Maps the two accepted input shapes onto [`CanonicalRecord`]s.
//!
//! JSON submissions are keyed by canonical field name, spreadsheet rows are
//! paired positionally with a header row of localized column titles. Either
//! every row of a batch normalizes or the whole batch is rejected.

use crate::record::{CanonicalRecord, Field};
use crate::tabular::TabularSheet;
use serde_json::Value;
use thiserror::Error;

pub type JsonRow = serde_json::Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// A batch of rows as received, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum RawInput {
    Json(Vec<JsonRow>),
    Tabular(TabularSheet),
}

/// Associates a localized spreadsheet header with its canonical field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderMapping {
    pub header: &'static str,
    pub field: Field,
}

/// Every canonical field must be reachable through exactly one header.
pub const HEADER_MAPPING: &[HeaderMapping] = &[
    HeaderMapping { header: "通话ID", field: Field::CallId },
    HeaderMapping { header: "主叫号码", field: Field::CallerNumber },
    HeaderMapping { header: "被叫号码", field: Field::CalleeNumber },
    HeaderMapping { header: "呼叫类型", field: Field::CallType },
    HeaderMapping { header: "呼叫时间", field: Field::CallTime },
    HeaderMapping { header: "坐席接听时间", field: Field::AgentCallTime },
    HeaderMapping { header: "部门", field: Field::Department },
    HeaderMapping { header: "坐席姓名", field: Field::AgentName },
    HeaderMapping { header: "坐席工号", field: Field::AgentId },
    HeaderMapping { header: "通话状态", field: Field::CallStatus },
    HeaderMapping { header: "技能组", field: Field::SkillGroup },
    HeaderMapping { header: "结束节点", field: Field::EndNode },
    HeaderMapping { header: "按键轨迹", field: Field::KeyTrack },
    HeaderMapping { header: "省", field: Field::Province },
    HeaderMapping { header: "市", field: Field::City },
    HeaderMapping { header: "PBX名称", field: Field::PbxName },
];

pub fn normalize(input: RawInput) -> Result<Vec<CanonicalRecord>, ValidationError> {
    match input {
        RawInput::Json(rows) => normalize_json(rows),
        RawInput::Tabular(sheet) => normalize_tabular(sheet),
    }
}

fn normalize_json(rows: Vec<JsonRow>) -> Result<Vec<CanonicalRecord>, ValidationError> {
    // Check the whole batch before converting anything.
    for row in &rows {
        if let Some(missing) = Field::ALL.iter().find(|f| !row.contains_key(f.as_str())) {
            return Err(ValidationError::MissingField(missing.as_str().to_string()));
        }
    }

    Ok(rows
        .into_iter()
        .map(|mut row| {
            let mut record = CanonicalRecord::default();
            for field in Field::ALL {
                if let Some(value) = row.remove(field.as_str()) {
                    record.set(field, json_to_text(value));
                }
            }
            record
        })
        .collect())
}

fn json_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn normalize_tabular(sheet: TabularSheet) -> Result<Vec<CanonicalRecord>, ValidationError> {
    let columns = HEADER_MAPPING
        .iter()
        .map(|mapping| {
            sheet
                .headers
                .iter()
                .position(|h| h.trim() == mapping.header)
                .map(|index| (index, mapping.field))
                .ok_or_else(|| ValidationError::MissingField(mapping.header.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sheet
        .rows
        .into_iter()
        .map(|row| {
            let mut record = CanonicalRecord::default();
            for (index, field) in &columns {
                if let Some(cell) = row.get(*index) {
                    record.set(*field, cell.clone());
                }
            }
            record
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{full_json_row, sheet_headers};
    use serde_json::json;

    #[test]
    fn test_header_mapping_covers_every_field_once() {
        for field in Field::ALL {
            let count = HEADER_MAPPING.iter().filter(|m| m.field == field).count();
            assert_eq!(count, 1, "{field:?}");
        }
    }

    #[test]
    fn test_json_rows() {
        let mut row = full_json_row("1");
        row.insert("extra".into(), json!("ignored"));
        row.insert("agent_id".into(), json!(1042));
        row.insert("key_track".into(), Value::Null);

        let records = normalize(RawInput::Json(vec![row, full_json_row("2")])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].call_id, "1");
        assert_eq!(records[0].agent_id, "1042");
        assert_eq!(records[0].key_track, "");
        assert_eq!(records[0].province, "province-1");
        assert_eq!(records[1].call_id, "2");
    }

    #[test]
    fn test_json_missing_field_rejects_batch() {
        let mut partial = JsonRow::new();
        partial.insert("call_id".into(), json!("1"));
        partial.insert("caller_number".into(), json!("x"));

        let err = normalize(RawInput::Json(vec![full_json_row("0"), partial])).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("callee_number".into()));
        assert_eq!(err.to_string(), "Missing required field: callee_number");
    }

    #[test]
    fn test_json_reports_first_offending_row() {
        let mut first = full_json_row("1");
        first.remove("pbx_name");
        let mut second = full_json_row("2");
        second.remove("caller_number");

        let err = normalize(RawInput::Json(vec![first, second])).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("pbx_name".into()));
    }

    #[test]
    fn test_tabular_projection() {
        let mut headers = sheet_headers();
        headers.reverse();
        headers.insert(3, "备注".to_string());
        headers[0] = format!(" {} ", headers[0]);

        let mut row: Vec<String> = headers.iter().map(|h| format!("v:{}", h.trim())).collect();
        // Trailing cells missing entirely.
        row.truncate(row.len() - 2);

        let sheet = TabularSheet {
            headers,
            rows: vec![row],
        };
        let records = normalize(RawInput::Tabular(sheet)).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.pbx_name, "v:PBX名称");
        assert_eq!(record.province, "v:省");
        // The reversed header order puts these two last.
        assert_eq!(record.caller_number, "");
        assert_eq!(record.call_id, "");
    }

    #[test]
    fn test_tabular_missing_header() {
        let headers: Vec<String> = sheet_headers().into_iter().filter(|h| h != "省").collect();
        let sheet = TabularSheet {
            headers,
            rows: vec![vec!["1".to_string()]],
        };

        let err = normalize(RawInput::Tabular(sheet)).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("省".into()));
    }

    #[test]
    fn test_tabular_without_data_rows() {
        let sheet = TabularSheet {
            headers: sheet_headers(),
            rows: Vec::new(),
        };
        assert!(normalize(RawInput::Tabular(sheet)).unwrap().is_empty());
    }
}
