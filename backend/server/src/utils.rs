use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{canvas::Canvas, placement::PlacementRequest};

/// Raw `/place-pixel` body. Fields stay untyped so every bad field can be reported.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPayload {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub x: Option<Value>,
    #[serde(default)]
    pub y: Option<Value>,
    #[serde(default)]
    pub color: Option<Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            field,
            message: message.into(),
            value,
        }
    }
}

pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

pub fn validate_placement(
    payload: PlacementPayload,
    canvas: &Canvas,
) -> Result<PlacementRequest, Vec<FieldError>> {
    let mut errors = Vec::new();

    let user_id = match payload.user_id {
        Some(Value::String(user_id)) if !user_id.is_empty() => Some(user_id),
        Some(Value::String(_)) => {
            errors.push(FieldError::new("userId", "must not be empty", None));
            None
        }
        other => {
            errors.push(FieldError::new("userId", "must be a string", other));
            None
        }
    };

    let x = coordinate("x", payload.x, canvas.size(), &mut errors);
    let y = coordinate("y", payload.y, canvas.size(), &mut errors);

    let color = match payload.color {
        Some(Value::String(color)) if canvas.palette().contains(&color) => Some(color),
        other => {
            let message = format!("must be one of {}", canvas.palette().colors().join(", "));
            errors.push(FieldError::new("color", message, other));
            None
        }
    };

    match (user_id, x, y, color) {
        (Some(user_id), Some(x), Some(y), Some(color)) if errors.is_empty() => {
            Ok(PlacementRequest {
                user_id,
                x,
                y,
                color,
            })
        }
        _ => Err(errors),
    }
}

fn coordinate(
    field: &'static str,
    value: Option<Value>,
    size: u32,
    errors: &mut Vec<FieldError>,
) -> Option<u32> {
    // whole numbers only, `1.0` included
    let parsed = match &value {
        Some(Value::Number(number)) => number.as_f64().filter(|n| n.fract() == 0.0),
        Some(Value::String(text)) => text.trim().parse::<i128>().ok().map(|n| n as f64),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 0.0 && n < f64::from(size) => Some(n as u32),
        Some(_) => {
            let message = format!("must be between 0 and {}", size.saturating_sub(1));
            errors.push(FieldError::new(field, message, value));
            None
        }
        None => {
            errors.push(FieldError::new(field, "must be an integer", value));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::canvas::Palette;

    fn canvas() -> Canvas {
        Canvas::new(50, Arc::new(Palette::default()))
    }

    fn payload(value: Value) -> PlacementPayload {
        serde_json::from_value(value).unwrap()
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid() {
        let request = validate_placement(
            payload(json!({"userId": "user123456", "x": 49, "y": 0, "color": "red"})),
            &canvas(),
        )
        .unwrap();

        assert_eq!(request.user_id, "user123456");
        assert_eq!((request.x, request.y), (49, 0));
        assert_eq!(request.color, "red");
    }

    #[test]
    fn test_integer_strings() {
        let request = validate_placement(
            payload(json!({"userId": "a", "x": "7", "y": " 3 ", "color": "gray"})),
            &canvas(),
        )
        .unwrap();

        assert_eq!((request.x, request.y), (7, 3));
    }

    #[test]
    fn test_out_of_range() {
        let errors = validate_placement(
            payload(json!({"userId": "a", "x": 50, "y": -1, "color": "red"})),
            &canvas(),
        )
        .unwrap_err();

        assert_eq!(fields(&errors), vec!["x", "y"]);
        assert_eq!(errors[0].message, "must be between 0 and 49");
        assert_eq!(errors[0].value, Some(json!(50)));
    }

    #[test]
    fn test_not_integers() {
        let errors = validate_placement(
            payload(json!({"userId": "a", "x": 1.5, "y": "one", "color": "red"})),
            &canvas(),
        )
        .unwrap_err();

        assert_eq!(fields(&errors), vec!["x", "y"]);
        assert_eq!(errors[1].message, "must be an integer");
    }

    #[test]
    fn test_whole_floats_accepted() {
        let request = validate_placement(
            payload(json!({"userId": "a", "x": 1.0, "y": 0.0, "color": "red"})),
            &canvas(),
        )
        .unwrap();

        assert_eq!((request.x, request.y), (1, 0));
    }

    #[test]
    fn test_huge_values_out_of_range() {
        let errors = validate_placement(
            payload(json!({"userId": "a", "x": 1e20, "y": "99999999999999999999", "color": "red"})),
            &canvas(),
        )
        .unwrap_err();

        assert_eq!(fields(&errors), vec!["x", "y"]);
        assert!(errors.iter().all(|e| e.message == "must be between 0 and 49"));
    }

    #[test]
    fn test_every_bad_field_reported() {
        let errors = validate_placement(payload(json!({"userId": ""})), &canvas()).unwrap_err();

        assert_eq!(fields(&errors), vec!["userId", "x", "y", "color"]);
    }

    #[test]
    fn test_unknown_color() {
        let errors = validate_placement(
            payload(json!({"userId": "a", "x": 1, "y": 1, "color": "magenta"})),
            &canvas(),
        )
        .unwrap_err();

        assert_eq!(fields(&errors), vec!["color"]);
        assert!(errors[0].message.starts_with("must be one of red, blue"));
    }

    #[test]
    fn test_user_id_must_be_string() {
        let errors = validate_placement(
            payload(json!({"userId": 42, "x": 1, "y": 1, "color": "red"})),
            &canvas(),
        )
        .unwrap_err();

        assert_eq!(errors, vec![FieldError::new("userId", "must be a string", Some(json!(42)))]);
    }
}
