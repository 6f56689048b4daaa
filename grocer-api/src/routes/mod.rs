/// API route handlers
///
/// Request bodies use `Option` fields throughout so that a missing field
/// reaches the handler and produces the storefront's own 400 message instead
/// of an extractor rejection.

pub mod address;
pub mod cart;
pub mod category;
pub mod health;
pub mod order;
pub mod product;
pub mod sub_category;
pub mod user;

use crate::error::{ApiError, ApiResult};
use uuid::Uuid;

/// Returns the trimmed value when it is present and non-empty
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a required ID field, answering `missing` when it is absent
pub(crate) fn required_id(value: &Option<String>, missing: &str) -> ApiResult<Uuid> {
    let raw = present(value).ok_or_else(|| ApiError::BadRequest(missing.to_string()))?;

    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
}

/// Parses a list of IDs, rejecting the whole list if any entry is malformed
pub(crate) fn parse_ids(values: &[String]) -> ApiResult<Vec<Uuid>> {
    values
        .iter()
        .map(|raw| {
            Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present() {
        assert_eq!(present(&Some("  milk ".to_string())), Some("milk"));
        assert_eq!(present(&Some("   ".to_string())), None);
        assert_eq!(present(&None), None);
    }

    #[test]
    fn test_required_id() {
        let id = Uuid::new_v4();
        assert_eq!(required_id(&Some(id.to_string()), "Provide _id").unwrap(), id);

        match required_id(&None, "Provide _id") {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Provide _id"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            required_id(&Some("not-a-uuid".to_string()), "Provide _id"),
            Err(ApiError::BadRequest(msg)) if msg.starts_with("Invalid id")
        ));
    }

    #[test]
    fn test_parse_ids() {
        let a = Uuid::new_v4();
        assert_eq!(parse_ids(&[a.to_string()]).unwrap(), vec![a]);
        assert!(parse_ids(&[a.to_string(), "x".to_string()]).is_err());
        assert!(parse_ids(&[]).unwrap().is_empty());
    }
}
