use std::fs;
use std::path::PathBuf;

use edi_adapter_edifact::{EdiConfig, EdiDocument, Error, SegmentReader};
use edi_ir::Value;
use serde_json::json;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn orders_document() -> EdiDocument {
    let schema_path = repo_root().join("testdata/schemas/orders_interchange.json");
    EdiDocument::from_file(&schema_path).expect("schema should compile")
}

fn orders_fixture() -> String {
    fs::read_to_string(repo_root().join("testdata/edi/orders_interchange.edi"))
        .expect("edi fixture should load")
}

fn inline_config() -> EdiConfig {
    EdiConfig {
        segment_separator: "'".to_string(),
        ..EdiConfig::default()
    }
}

#[test]
fn test_parse_orders_interchange() {
    let document = orders_document();
    let value = document
        .parse(&orders_fixture(), &EdiConfig::default())
        .expect("edi should parse");

    assert_eq!(
        value.pointer("interchangeHeader/interchangeSender/identification"),
        Some(&Value::from("9900000000001"))
    );
    assert_eq!(
        value
            .pointer("messages")
            .and_then(Value::as_array)
            .map(<[Value]>::len),
        Some(2)
    );
    assert_eq!(
        value.pointer("messages[0]/beginningOfMessage/documentIdentification/documentIdentifier"),
        Some(&Value::from("PO+1001"))
    );
    assert_eq!(
        value.pointer("messages[0]/lines[0]/quantity/quantity"),
        Some(&Value::Decimal(12.5))
    );
    assert!(value.pointer("messages[0]/lines[1]/quantity").is_none());
    assert_eq!(
        value
            .pointer("messages[0]/datetimes[0]/value")
            .and_then(Value::as_datetime)
            .map(chrono::DateTime::to_rfc3339)
            .as_deref(),
        Some("2017-01-01T12:00:00+01:00")
    );
    assert_eq!(
        value.pointer("messages[1]/messageTrailer/numberOfSegmentsInMessage"),
        Some(&Value::Integer(3))
    );
    assert_eq!(
        value.pointer("interchangeTrailer/interchangeControlCount"),
        Some(&Value::Integer(2))
    );
    assert!(document.validate(&value).is_empty());
}

#[test]
fn test_round_trip_reproduces_fixture() {
    let document = orders_document();
    let fixture = orders_fixture();
    let config = EdiConfig::default();

    let value = document.parse(&fixture, &config).expect("edi should parse");
    let text = document
        .serialize(&value, &config)
        .expect("value should serialize");
    assert_eq!(text, fixture);

    let reparsed = document.parse(&text, &config).expect("output should parse");
    assert_eq!(reparsed, value);
}

#[test]
fn test_round_trip_through_json() -> anyhow::Result<()> {
    let document = orders_document();
    let fixture = orders_fixture();
    let config = EdiConfig::default();

    let value = document.parse(&fixture, &config)?;
    let json = serde_json::to_string(&value)?;
    let restored: Value = serde_json::from_str(&json)?;

    assert_eq!(document.serialize(&restored, &config)?, fixture);
    Ok(())
}

#[test]
fn test_counters_follow_the_value_tree() {
    let document = orders_document();
    let config = EdiConfig::default();
    let mut value = document
        .parse(&orders_fixture(), &config)
        .expect("edi should parse");

    // Drop the second line (LIN) and the second message
    value
        .pointer_mut("messages[0]/lines")
        .and_then(Value::as_array_mut)
        .expect("lines")
        .pop();
    value
        .pointer_mut("messages")
        .and_then(Value::as_array_mut)
        .expect("messages")
        .pop();

    let text = document
        .serialize(&value, &config)
        .expect("value should serialize");
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&"UNT+6+MSG1'"), "{text}");
    assert_eq!(lines.last(), Some(&"UNZ+1+REF0001'"));
    assert!(!text.contains("MSG2"));
}

#[test]
fn test_output_follows_edi_order() {
    let document = orders_document().without_validation();
    let value = Value::from(json!({
        "interchangeTrailer": {"interchangeControlReference": "R"},
        "messages": [{
            "messageTrailer": {"messageReferenceNumber": "M"},
            "lines": [{"lineItem": {"lineItemIdentifier": "1"}}],
            "beginningOfMessage": {"messageFunctionCode": "9"},
            "messageHeader": {"messageReferenceNumber": "M"}
        }],
        "interchangeHeader": {
            "interchangeControlReference": "R",
            "syntaxIdentifier": {"syntaxIdentifier": "UNOC", "syntaxVersionNumber": "3"}
        }
    }));

    let text = document
        .serialize(&value, &inline_config())
        .expect("value should serialize");
    assert_eq!(
        text,
        "UNB+UNOC:3++++R'UNH+M'BGM+++9'LIN+1'UNT+4+M'UNZ+1+R'"
    );
}

#[test]
fn test_synthetic_group_renders_one_segment_per_item() {
    let document = EdiDocument::from_json(
        r#"{
            "type": "object",
            "properties": {
                "lines": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "edi_tag": "LIN",
                        "properties": {
                            "id": {"type": "string", "edi_ref": "1082"}
                        }
                    }
                }
            }
        }"#,
    )
    .expect("schema should compile");

    let value = Value::from(json!({"lines": [{"id": "A"}, {"id": "B"}]}));
    let text = document
        .serialize(&value, &inline_config())
        .expect("value should serialize");
    assert_eq!(text, "LIN+A'LIN+B'");

    let parsed = document
        .parse(&text, &inline_config())
        .expect("output should parse");
    assert_eq!(parsed, value);
}

#[test]
fn test_validation_failure_reports_paths() {
    let document = orders_document();
    let value = Value::from(json!({
        "interchangeHeader": {"syntaxIdentifier": {"syntaxIdentifier": "UNOC"}},
        "messages": [{
            "messageHeader": {
                "messageReferenceNumber": "MSG1",
                "messageIdentifier": {"messageType": "INVOIC"}
            }
        }]
    }));

    match document.serialize(&value, &EdiConfig::default()) {
        Err(Error::Validation { violations }) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(
                violations[0].path,
                "messages[0]/messageHeader/messageIdentifier/messageType"
            );
            assert_eq!(violations[0].keyword, "enum");
        }
        other => panic!("Expected Validation error, got {other:?}"),
    }
}

#[test]
fn test_tokenizer_unescapes_components() {
    let mut reader = SegmentReader::new("UNH+1:2?+3'", &EdiConfig::default());
    let segment = reader.next().expect("one segment");

    assert_eq!(segment.tag, "UNH");
    assert_eq!(segment.elements(), vec![vec!["1", "2+3"]]);
    assert!(reader.next().is_none());
}

#[test]
fn test_unmatched_segments_are_left_over() {
    let document = orders_document();
    let value = document
        .parse("FTX+AAI'UNB+UNOC:3'", &EdiConfig::default())
        .expect("parse never fails on content");
    assert_eq!(value, Value::record());
}
