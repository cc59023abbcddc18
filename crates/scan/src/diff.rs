//! Layer-set comparison between two revisions of a document.
//!
//! Comparison is keyed on layer *name*: a renamed layer therefore reports as
//! one deletion plus one addition rather than a modification. Content changes
//! on a name-matched layer are detected through the per-layer identity
//! fingerprint.

use crate::blend::BlendMode;
use crate::psd::DetailedLayer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An old/new pair for a single changed property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDelta<T> {
    pub old: T,
    pub new: T,
}

/// Per-property differences for a modified layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<PropertyDelta<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<PropertyDelta<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<PropertyDelta<BlendMode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PropertyDelta<[i32; 4]>>,
}

impl PropertyChanges {
    fn between(old: &DetailedLayer, new: &DetailedLayer) -> Self {
        let mut changes = Self::default();
        if old.opacity != new.opacity {
            changes.opacity = Some(PropertyDelta { old: old.opacity, new: new.opacity });
        }
        if old.visible != new.visible {
            changes.visibility = Some(PropertyDelta { old: old.visible, new: new.visible });
        }
        if old.blend_mode != new.blend_mode {
            changes.blend_mode = Some(PropertyDelta { old: old.blend_mode, new: new.blend_mode });
        }
        if old.bounds != new.bounds {
            changes.position = Some(PropertyDelta { old: old.bounds, new: new.bounds });
        }
        changes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opacity.is_none() && self.visibility.is_none() && self.blend_mode.is_none() && self.position.is_none()
    }
}

/// What happened to a layer between two revisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Deleted,
    Modified,
}

/// A single detected layer change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerChange {
    pub layer_id: usize,
    pub layer_name: String,
    pub change_type: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_changes: Option<PropertyChanges>,
}

/// Full comparison of two layer sets.
///
/// Embedded verbatim in the smart-delta manifest (`layer_analysis`), so the
/// field names are part of the on-disk format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    pub total_layers: usize,
    pub added_layers: Vec<LayerChange>,
    pub deleted_layers: Vec<LayerChange>,
    pub changed_layers: Vec<LayerChange>,
    pub unchanged_count: usize,
    pub changes_summary: String,
}

impl ChangeAnalysis {
    /// Compare two layer lists.
    ///
    /// # Examples
    ///
    /// ```
    /// use dgit_scan::ChangeAnalysis;
    ///
    /// let analysis = ChangeAnalysis::between(&[], &[]);
    /// assert_eq!(analysis.changes_summary, "No layer changes detected");
    /// ```
    #[must_use]
    pub fn between(old: &[DetailedLayer], new: &[DetailedLayer]) -> Self {
        let old_by_name: HashMap<&str, &DetailedLayer> = old.iter().map(|l| (l.name.as_str(), l)).collect();
        let new_by_name: HashMap<&str, &DetailedLayer> = new.iter().map(|l| (l.name.as_str(), l)).collect();

        let added_layers: Vec<LayerChange> = new
            .iter()
            .filter(|layer| !old_by_name.contains_key(layer.name.as_str()))
            .map(|layer| LayerChange {
                layer_id: layer.id,
                layer_name: layer.name.clone(),
                change_type: ChangeType::Added,
                old_hash: None,
                new_hash: Some(layer.content_hash.clone()),
                property_changes: None,
            })
            .collect();

        let deleted_layers: Vec<LayerChange> = old
            .iter()
            .filter(|layer| !new_by_name.contains_key(layer.name.as_str()))
            .map(|layer| LayerChange {
                layer_id: layer.id,
                layer_name: layer.name.clone(),
                change_type: ChangeType::Deleted,
                old_hash: Some(layer.content_hash.clone()),
                new_hash: None,
                property_changes: None,
            })
            .collect();

        let changed_layers: Vec<LayerChange> = new
            .iter()
            .filter_map(|layer| {
                let previous = old_by_name.get(layer.name.as_str())?;
                (previous.content_hash != layer.content_hash).then(|| LayerChange {
                    layer_id: layer.id,
                    layer_name: layer.name.clone(),
                    change_type: ChangeType::Modified,
                    old_hash: Some(previous.content_hash.clone()),
                    new_hash: Some(layer.content_hash.clone()),
                    property_changes: Some(PropertyChanges::between(previous, layer)),
                })
            })
            .collect();

        let unchanged_count = new.len() - changed_layers.len() - added_layers.len();
        let changes_summary = summarize(&added_layers, &deleted_layers, &changed_layers);
        Self {
            total_layers: new.len(),
            added_layers,
            deleted_layers,
            changed_layers,
            unchanged_count,
            changes_summary,
        }
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.added_layers.is_empty() && self.deleted_layers.is_empty() && self.changed_layers.is_empty())
    }
}

fn summarize(added: &[LayerChange], deleted: &[LayerChange], changed: &[LayerChange]) -> String {
    let total = added.len() + deleted.len() + changed.len();
    if total == 0 {
        return "No layer changes detected".to_string();
    }
    let mut summary = format!("{total} layer(s) changed");
    if !added.is_empty() {
        summary.push_str(&format!(", {} added", added.len()));
    }
    if !deleted.is_empty() {
        summary.push_str(&format!(", {} deleted", deleted.len()));
    }
    if !changed.is_empty() {
        summary.push_str(&format!(", {} modified", changed.len()));
    }
    summary
}
