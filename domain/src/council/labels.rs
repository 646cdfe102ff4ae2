//! Response anonymization labels.
//!
//! Labels are synthetic "Response A".."Response Z" tokens assigned strictly
//! by Stage-1 array position. A label map is valid only relative to the
//! exact Stage-1 array it was built from.

use super::results::Stage1Response;
use crate::core::model::Model;
use std::collections::BTreeMap;

/// Label for the response at the given Stage-1 array position.
pub fn position_label(position: usize) -> String {
    debug_assert!(position < 26, "council larger than the label alphabet");
    format!("Response {}", (b'A' + (position % 26) as u8) as char)
}

/// Assign `(label, response text)` pairs in Stage-1 array order.
pub fn assign_labels(stage1: &[Stage1Response]) -> Vec<(String, &str)> {
    stage1
        .iter()
        .enumerate()
        .map(|(i, result)| (position_label(i), result.response.as_str()))
        .collect()
}

/// Derive the label-to-model map from a Stage-1 array.
///
/// Deterministic in the array order, so the same map can be re-derived from
/// a stored Stage-1 array later.
pub fn derive_label_map(stage1: &[Stage1Response]) -> BTreeMap<String, Model> {
    stage1
        .iter()
        .enumerate()
        .map(|(i, result)| (position_label(i), result.model.clone()))
        .collect()
}
