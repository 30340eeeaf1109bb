//! Consumption report post-processing
//!
//! Works in place on a parsed interchange value.

use crate::{Error, Result};
use edi_ir::Value;
use tracing::{debug, warn};

/// DTM function code qualifiers and the field each one is attached as
const DATE_QUALIFIERS: [(&str, &str); 3] = [
    ("163", "startDate"),
    ("164", "endDate"),
    ("9", "processingDate"),
];

const METERING_POINT_PATH: &str = "placeLocationIdentifications/locationIdentification/locationName";

/// Copy qualified dates from a `datetimes` group onto `target`
///
/// Occurrences with other qualifiers are ignored; a later occurrence with
/// the same qualifier wins.
pub fn attach_dates(target: &mut Value, datetimes: Option<&Value>) {
    let Some(datetimes) = datetimes.and_then(Value::as_array) else {
        return;
    };

    for datetime in datetimes {
        let qualifier = datetime
            .get("functionCodeQualifier")
            .and_then(Value::as_str);
        let field = DATE_QUALIFIERS
            .iter()
            .find(|(code, _)| Some(*code) == qualifier)
            .map(|(_, field)| *field);

        if let (Some(field), Some(value)) = (field, datetime.get("value")) {
            target.insert(field, value.clone());
        }
    }
}

fn group_mut<'a>(parent: &'a mut Value, name: &str) -> Result<&'a mut Vec<Value>> {
    parent
        .get_mut(name)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| Error::missing_group(name))
}

/// Attach dates to locations and quantities, returning the metering point ids
///
/// Every message must carry segment group 5, every group 5 occurrence a
/// group 6 and every group 9 occurrence a group 10. Group 9 itself is
/// conditional.
///
/// # Errors
///
/// Returns [`Error::MissingGroup`] naming the first mandatory group that is
/// absent.
pub fn enrich(interchange: &mut Value) -> Result<Vec<String>> {
    let mut metering_points = Vec::new();

    for message in group_mut(interchange, "messages")? {
        for group5 in group_mut(message, "segmentGroup5")? {
            for group6 in group_mut(group5, "segmentGroup6")? {
                match group6.pointer(METERING_POINT_PATH).and_then(Value::as_str) {
                    Some(id) => metering_points.push(id.to_string()),
                    None => warn!("Location without metering point identifier"),
                }

                let datetimes = group6.get("datetimes").cloned();
                if let Some(location) = group6.get_mut("placeLocationIdentifications") {
                    attach_dates(location, datetimes.as_ref());
                }

                let Some(groups9) = group6
                    .get_mut("segmentGroup9")
                    .and_then(Value::as_array_mut)
                else {
                    continue;
                };

                for group9 in groups9 {
                    for group10 in group_mut(group9, "segmentGroup10")? {
                        let datetimes = group10.get("datetimes").cloned();
                        if let Some(quantity) = group10.get_mut("quantity") {
                            attach_dates(quantity, datetimes.as_ref());
                        }
                    }
                }
            }
        }
    }

    debug!("Collected {} metering point(s)", metering_points.len());
    Ok(metering_points)
}

/// Check `interchangeTrailer/interchangeControlCount` against the messages
///
/// Returns the number of messages.
///
/// # Errors
///
/// Returns a value error when the trailer count is missing or not an integer
/// and [`Error::ControlCountMismatch`] when it differs from the number of
/// parsed messages.
pub fn check_control_count(interchange: &Value) -> Result<usize> {
    const PATH: &str = "interchangeTrailer/interchangeControlCount";

    let parsed = interchange
        .get("messages")
        .and_then(Value::as_array)
        .map_or(0, <[Value]>::len);

    let declared = interchange.navigate(PATH)?;
    let declared = declared
        .as_i64()
        .ok_or_else(|| edi_ir::Error::type_mismatch(PATH, "integer", declared.kind()))?;

    if usize::try_from(declared).ok() != Some(parsed) {
        return Err(Error::ControlCountMismatch { declared, parsed });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interchange() -> Value {
        Value::from(json!({
            "messages": [{
                "segmentGroup5": [{
                    "segmentGroup6": [{
                        "placeLocationIdentifications": {
                            "locationIdentification": {"locationName": "AT001"}
                        },
                        "datetimes": [
                            {"functionCodeQualifier": "163", "value": "start"},
                            {"functionCodeQualifier": "164", "value": "end"},
                            {"functionCodeQualifier": "137", "value": "ignored"}
                        ],
                        "segmentGroup9": [{
                            "segmentGroup10": [
                                {"quantity": {"quantity": 1.5},
                                 "datetimes": [{"functionCodeQualifier": "9", "value": "done"}]},
                                {"quantity": {"quantity": 2.5}}
                            ]
                        }]
                    }, {
                        "placeLocationIdentifications": {
                            "locationIdentification": {"locationName": "AT002"}
                        }
                    }]
                }]
            }],
            "interchangeTrailer": {"interchangeControlCount": 1}
        }))
    }

    #[test]
    fn test_enrich_attaches_dates() {
        let mut value = interchange();
        let ids = enrich(&mut value).unwrap();
        assert_eq!(ids, vec!["AT001", "AT002"]);

        let group6 = "messages[0]/segmentGroup5[0]/segmentGroup6[0]";
        assert_eq!(
            value
                .pointer(&format!("{group6}/placeLocationIdentifications"))
                .unwrap()
                .to_json(),
            json!({
                "locationIdentification": {"locationName": "AT001"},
                "startDate": "start",
                "endDate": "end"
            })
        );
        assert_eq!(
            value.pointer(&format!(
                "{group6}/segmentGroup9[0]/segmentGroup10[0]/quantity/processingDate"
            )),
            Some(&Value::from("done"))
        );
        assert_eq!(
            value
                .pointer(&format!("{group6}/segmentGroup9[0]/segmentGroup10[1]/quantity"))
                .unwrap()
                .to_json(),
            json!({"quantity": 2.5})
        );
    }

    #[test]
    fn test_missing_groups() {
        let mut value = Value::from(json!({"messages": [{"segmentGroup5": [{}]}]}));
        assert!(matches!(
            enrich(&mut value),
            Err(Error::MissingGroup(ref name)) if name == "segmentGroup6"
        ));

        let mut value = Value::from(json!({}));
        assert!(matches!(
            enrich(&mut value),
            Err(Error::MissingGroup(ref name)) if name == "messages"
        ));

        let mut value = Value::from(json!({"messages": [{"segmentGroup5": [{
            "segmentGroup6": [{"segmentGroup9": [{}]}]
        }]}]}));
        assert!(matches!(
            enrich(&mut value),
            Err(Error::MissingGroup(ref name)) if name == "segmentGroup10"
        ));
    }

    #[test]
    fn test_control_count() {
        assert_eq!(check_control_count(&interchange()).unwrap(), 1);

        let mut value = interchange();
        *value
            .pointer_mut("interchangeTrailer/interchangeControlCount")
            .unwrap() = Value::Integer(3);
        assert!(matches!(
            check_control_count(&value),
            Err(Error::ControlCountMismatch { declared: 3, parsed: 1 })
        ));

        let value = Value::from(json!({"messages": []}));
        assert!(matches!(
            check_control_count(&value),
            Err(Error::Value(edi_ir::Error::NodeNotFound { .. }))
        ));

        let value = Value::from(json!({"interchangeTrailer": {"interchangeControlCount": "1"}}));
        assert!(matches!(
            check_control_count(&value),
            Err(Error::Value(edi_ir::Error::TypeMismatch { .. }))
        ));
    }
}
