//! Strict validator for the `kb.v1` event shape.
//!
//! Accepts an arbitrary `serde_json::Value` (the orchestrator has already
//! filled in defaults by this point) and returns either a validated,
//! strongly-typed event or the full list of violations found — never a
//! single first-error-wins short circuit, so callers can report everything
//! wrong with one submission at once.

use serde_json::Value;

use crate::error::{ValidationCode, ValidationViolation};
use crate::event::{AnalyticsEventV1, ActorType, HashMeta, SCHEMA_V1};

fn actor_type_known(t: &str) -> bool {
    ActorType::parse(t).is_some()
}

const TOP_LEVEL_FIELDS: &[&str] =
    &["id", "schema", "type", "ts", "ingestTs", "source", "runId", "actor", "ctx", "payload", "hashMeta"];

pub fn validate(value: &Value) -> Result<AnalyticsEventV1, Vec<ValidationViolation>> {
    let mut violations = Vec::new();

    let obj = match value.as_object() {
        Some(o) => o,
        None => {
            violations.push(ValidationViolation::new("$", "event must be a JSON object", ValidationCode::WrongType));
            return Err(violations);
        }
    };

    for key in obj.keys() {
        if !TOP_LEVEL_FIELDS.contains(&key.as_str()) {
            violations.push(ValidationViolation::new(
                format!("$.{key}"),
                "unknown top-level field",
                ValidationCode::UnknownField,
            ));
        }
    }

    check_non_empty_string(obj, "id", &mut violations);
    if let Some(Value::String(id)) = obj.get("id") {
        if uuid::Uuid::parse_str(id).is_err() {
            violations.push(ValidationViolation::new("$.id", "id must be a valid UUID", ValidationCode::InvalidUuid));
        }
    }

    match obj.get("schema") {
        Some(Value::String(s)) if s == SCHEMA_V1 => {}
        Some(Value::String(_)) => violations.push(ValidationViolation::new(
            "$.schema",
            format!("schema must be literal \"{SCHEMA_V1}\""),
            ValidationCode::InvalidLiteral,
        )),
        Some(_) => violations.push(ValidationViolation::new("$.schema", "schema must be a string", ValidationCode::WrongType)),
        None => violations.push(ValidationViolation::new("$.schema", "schema is required", ValidationCode::MissingField)),
    }

    check_non_empty_string(obj, "type", &mut violations);
    check_rfc3339(obj, "ts", &mut violations);
    check_rfc3339(obj, "ingestTs", &mut violations);
    check_non_empty_string(obj, "runId", &mut violations);
    check_source(obj, &mut violations);
    check_actor(obj, &mut violations);
    check_ctx(obj, &mut violations);
    check_hash_meta(obj, &mut violations);

    if !violations.is_empty() {
        return Err(violations);
    }

    serde_json::from_value::<AnalyticsEventV1>(value.clone()).map_err(|e| {
        vec![ValidationViolation::new("$", format!("deserialization failed after structural checks passed: {e}"), ValidationCode::WrongType)]
    })
}

fn check_non_empty_string(obj: &serde_json::Map<String, Value>, field: &str, violations: &mut Vec<ValidationViolation>) {
    match obj.get(field) {
        Some(Value::String(s)) if !s.is_empty() => {}
        Some(Value::String(_)) => {
            violations.push(ValidationViolation::new(format!("$.{field}"), "must not be empty", ValidationCode::Empty))
        }
        Some(_) => violations.push(ValidationViolation::new(format!("$.{field}"), "must be a string", ValidationCode::WrongType)),
        None => violations.push(ValidationViolation::new(format!("$.{field}"), "is required", ValidationCode::MissingField)),
    }
}

fn check_rfc3339(obj: &serde_json::Map<String, Value>, field: &str, violations: &mut Vec<ValidationViolation>) {
    match obj.get(field) {
        Some(Value::String(s)) => {
            if chrono::DateTime::parse_from_rfc3339(s).is_err() {
                violations.push(ValidationViolation::new(
                    format!("$.{field}"),
                    "must be RFC-3339 with an explicit offset",
                    ValidationCode::InvalidTimestamp,
                ));
            }
        }
        Some(_) => violations.push(ValidationViolation::new(format!("$.{field}"), "must be a string", ValidationCode::WrongType)),
        None => violations.push(ValidationViolation::new(format!("$.{field}"), "is required", ValidationCode::MissingField)),
    }
}

fn check_source(obj: &serde_json::Map<String, Value>, violations: &mut Vec<ValidationViolation>) {
    match obj.get("source") {
        Some(Value::Object(src)) => {
            for field in ["product", "version"] {
                match src.get(field) {
                    Some(Value::String(s)) if !s.is_empty() => {}
                    Some(Value::String(_)) => violations.push(ValidationViolation::new(
                        format!("$.source.{field}"),
                        "must not be empty",
                        ValidationCode::Empty,
                    )),
                    Some(_) => violations.push(ValidationViolation::new(
                        format!("$.source.{field}"),
                        "must be a string",
                        ValidationCode::WrongType,
                    )),
                    None => violations.push(ValidationViolation::new(
                        format!("$.source.{field}"),
                        "is required",
                        ValidationCode::MissingField,
                    )),
                }
            }
        }
        Some(_) => violations.push(ValidationViolation::new("$.source", "must be an object", ValidationCode::WrongType)),
        None => violations.push(ValidationViolation::new("$.source", "is required", ValidationCode::MissingField)),
    }
}

fn check_actor(obj: &serde_json::Map<String, Value>, violations: &mut Vec<ValidationViolation>) {
    let Some(actor) = obj.get("actor") else { return };
    let Value::Object(actor) = actor else {
        violations.push(ValidationViolation::new("$.actor", "must be an object", ValidationCode::WrongType));
        return;
    };
    match actor.get("type") {
        Some(Value::String(t)) => {
            if !actor_type_known(t) {
                violations.push(ValidationViolation::new(
                    "$.actor.type",
                    "must be one of user, agent, ci",
                    ValidationCode::InvalidEnumValue,
                ));
            }
        }
        Some(_) => violations.push(ValidationViolation::new("$.actor.type", "must be a string", ValidationCode::WrongType)),
        None => violations.push(ValidationViolation::new("$.actor.type", "is required", ValidationCode::MissingField)),
    }
    for field in ["id", "name"] {
        if let Some(v) = actor.get(field) {
            if !v.is_string() {
                violations.push(ValidationViolation::new(
                    format!("$.actor.{field}"),
                    "must be a string when present",
                    ValidationCode::WrongType,
                ));
            }
        }
    }
}

fn check_ctx(obj: &serde_json::Map<String, Value>, violations: &mut Vec<ValidationViolation>) {
    let Some(ctx) = obj.get("ctx") else { return };
    let Value::Object(ctx) = ctx else {
        violations.push(ValidationViolation::new("$.ctx", "must be an object", ValidationCode::WrongType));
        return;
    };
    for (k, v) in ctx {
        let scalar = matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null);
        if !scalar {
            violations.push(ValidationViolation::new(
                format!("$.ctx.{k}"),
                "ctx values must be string, number, bool, or null",
                ValidationCode::WrongType,
            ));
        }
    }
}

fn check_hash_meta(obj: &serde_json::Map<String, Value>, violations: &mut Vec<ValidationViolation>) {
    let Some(hm) = obj.get("hashMeta") else { return };
    let Value::Object(hm) = hm else {
        violations.push(ValidationViolation::new("$.hashMeta", "must be an object", ValidationCode::WrongType));
        return;
    };
    match hm.get("algo") {
        Some(Value::String(a)) if a == HashMeta::ALGO_HMAC_SHA256 => {}
        Some(Value::String(_)) => violations.push(ValidationViolation::new(
            "$.hashMeta.algo",
            format!("algo must be literal \"{}\"", HashMeta::ALGO_HMAC_SHA256),
            ValidationCode::InvalidLiteral,
        )),
        Some(_) => violations.push(ValidationViolation::new("$.hashMeta.algo", "must be a string", ValidationCode::WrongType)),
        None => violations.push(ValidationViolation::new("$.hashMeta.algo", "is required", ValidationCode::MissingField)),
    }
    check_non_empty_string(hm, "saltId", violations);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_event() -> Value {
        json!({
            "id": "018f2f3c-8c3e-7c3e-8c3e-8c3e8c3e8c3e",
            "schema": "kb.v1",
            "type": "cli.invoked",
            "ts": "2026-07-31T00:00:00Z",
            "ingestTs": "2026-07-31T00:00:01Z",
            "source": {"product": "kb", "version": "1.0.0"},
            "runId": "run_1",
        })
    }

    #[test]
    fn accepts_a_minimal_valid_event() {
        assert!(validate(&valid_event()).is_ok());
    }

    #[test]
    fn rejects_missing_required_fields() {
        let v = json!({"type": "t"});
        let errs = validate(&v).unwrap_err();
        assert!(errs.iter().any(|e| e.path == "$.id"));
        assert!(errs.iter().any(|e| e.path == "$.source"));
        assert!(errs.iter().any(|e| e.path == "$.runId"));
    }

    #[test]
    fn rejects_unknown_top_level_fields() {
        let mut v = valid_event();
        v.as_object_mut().unwrap().insert("bogus".into(), json!(1));
        let errs = validate(&v).unwrap_err();
        assert!(errs.iter().any(|e| e.code == ValidationCode::UnknownField));
    }

    #[test]
    fn rejects_non_uuid_id() {
        let mut v = valid_event();
        v["id"] = json!("not-a-uuid");
        let errs = validate(&v).unwrap_err();
        assert!(errs.iter().any(|e| e.code == ValidationCode::InvalidUuid));
    }

    #[test]
    fn rejects_naive_timestamp_without_offset() {
        let mut v = valid_event();
        v["ts"] = json!("2026-07-31T00:00:00");
        let errs = validate(&v).unwrap_err();
        assert!(errs.iter().any(|e| e.path == "$.ts" && e.code == ValidationCode::InvalidTimestamp));
    }

    #[test]
    fn rejects_bad_actor_type() {
        let mut v = valid_event();
        v["actor"] = json!({"type": "robot"});
        let errs = validate(&v).unwrap_err();
        assert!(errs.iter().any(|e| e.path == "$.actor.type"));
    }

    #[test]
    fn rejects_bad_hash_meta_algo() {
        let mut v = valid_event();
        v["hashMeta"] = json!({"algo": "md5", "saltId": "default-2026-07"});
        let errs = validate(&v).unwrap_err();
        assert!(errs.iter().any(|e| e.path == "$.hashMeta.algo" && e.code == ValidationCode::InvalidLiteral));
    }
}
