//! Annotation records and drawing snapshots.
//!
//! A drawing is three independent id-keyed maps (shapes, bindings, assets).
//! `DrawingSnapshot` is an owned value: cloning it is a deep copy, which is
//! what bookmarks rely on. `DocumentDelta` carries only changed entries, with
//! `None` as the deletion marker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of drawable shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Draw,
    Rectangle,
    Ellipse,
    Triangle,
    Arrow,
    Line,
    Text,
    Sticky,
    Image,
    Video,
    Group,
}

/// Stroke size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeStyle {
    Small,
    #[default]
    Medium,
    Large,
}

/// Stroke dash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashStyle {
    #[default]
    Draw,
    Solid,
    Dashed,
    Dotted,
}

/// Visual style of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeStyle {
    pub color: String,
    pub size: SizeStyle,
    pub dash: DashStyle,
    pub is_filled: bool,
    pub scale: f64,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            color: "red".to_string(),
            size: SizeStyle::default(),
            dash: DashStyle::default(),
            is_filled: false,
            scale: 1.0,
        }
    }
}

/// A shape on the annotation surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub parent_id: String,
    #[serde(default)]
    pub child_index: f64,
    /// Top-left position in page space.
    pub point: [f64; 2],
    #[serde(default)]
    pub rotation: f64,
    /// Freehand samples as `[x, y, pressure]`, relative to `point`.
    #[serde(default)]
    pub points: Vec<[f64; 3]>,
    #[serde(default)]
    pub style: ShapeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

impl Shape {
    /// Create an empty freehand stroke at `point` on the default page.
    pub fn freehand(id: impl Into<String>, point: [f64; 2]) -> Self {
        Self {
            id: id.into(),
            kind: ShapeKind::Draw,
            parent_id: "page".to_string(),
            child_index: 1.0,
            point,
            rotation: 0.0,
            points: Vec::new(),
            style: ShapeStyle::default(),
            text: None,
            asset_id: None,
        }
    }
}

/// A binding attaches one shape (usually an arrow handle) to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub handle_id: String,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub point: [f64; 2],
}

/// Kind of embedded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

/// Media referenced by image/video shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub src: String,
    #[serde(default)]
    pub size: [f64; 2],
}

/// The three top-level containers of an annotation document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Shapes,
    Bindings,
    Assets,
}

impl Container {
    /// All containers in document order.
    pub const ALL: [Container; 3] = [Container::Shapes, Container::Bindings, Container::Assets];

    /// Key of this container in the document root.
    pub fn key(self) -> &'static str {
        match self {
            Self::Shapes => "shapes",
            Self::Bindings => "bindings",
            Self::Assets => "assets",
        }
    }
}

/// Full content of an annotation surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingSnapshot {
    #[serde(default)]
    pub shapes: BTreeMap<String, Shape>,
    #[serde(default)]
    pub bindings: BTreeMap<String, Binding>,
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
}

impl DrawingSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no records of any kind are present.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.bindings.is_empty() && self.assets.is_empty()
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.bindings.clear();
        self.assets.clear();
    }

    /// Insert or replace a shape, keyed by its id.
    pub fn insert_shape(&mut self, shape: Shape) {
        self.shapes.insert(shape.id.clone(), shape);
    }

    /// Insert or replace a binding, keyed by its id.
    pub fn insert_binding(&mut self, binding: Binding) {
        self.bindings.insert(binding.id.clone(), binding);
    }

    /// Insert or replace an asset, keyed by its id.
    pub fn insert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.id.clone(), asset);
    }

    /// Entries that differ between `self` and `next`, as a delta that turns
    /// `self` into `next` when applied.
    pub fn diff(&self, next: &DrawingSnapshot) -> DocumentDelta {
        DocumentDelta {
            shapes: diff_map(&self.shapes, &next.shapes),
            bindings: diff_map(&self.bindings, &next.bindings),
            assets: diff_map(&self.assets, &next.assets),
        }
    }

    /// Apply a delta in place. Tombstones remove, values upsert.
    pub fn apply(&mut self, delta: &DocumentDelta) {
        apply_map(&mut self.shapes, &delta.shapes);
        apply_map(&mut self.bindings, &delta.bindings);
        apply_map(&mut self.assets, &delta.assets);
    }
}

/// Changed entries of a drawing. `None` marks a removed entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDelta {
    #[serde(default)]
    pub shapes: BTreeMap<String, Option<Shape>>,
    #[serde(default)]
    pub bindings: BTreeMap<String, Option<Binding>>,
    #[serde(default)]
    pub assets: BTreeMap<String, Option<Asset>>,
}

impl DocumentDelta {
    /// Create an empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the delta carries no entries.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.bindings.is_empty() && self.assets.is_empty()
    }

    /// Number of changed entries across all containers.
    pub fn len(&self) -> usize {
        self.shapes.len() + self.bindings.len() + self.assets.len()
    }

    /// Record an added or modified shape.
    pub fn upsert_shape(&mut self, shape: Shape) {
        self.shapes.insert(shape.id.clone(), Some(shape));
    }

    /// Record a removed shape.
    pub fn remove_shape(&mut self, id: impl Into<String>) {
        self.shapes.insert(id.into(), None);
    }

    /// Record an added or modified binding.
    pub fn upsert_binding(&mut self, binding: Binding) {
        self.bindings.insert(binding.id.clone(), Some(binding));
    }

    /// Record a removed binding.
    pub fn remove_binding(&mut self, id: impl Into<String>) {
        self.bindings.insert(id.into(), None);
    }

    /// Record an added or modified asset.
    pub fn upsert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.id.clone(), Some(asset));
    }

    /// Record a removed asset.
    pub fn remove_asset(&mut self, id: impl Into<String>) {
        self.assets.insert(id.into(), None);
    }

    /// Fold a later delta into this one. Per entry the later state wins, so
    /// the result is the net effect of applying both in order.
    pub fn coalesce(&mut self, later: DocumentDelta) {
        self.shapes.extend(later.shapes);
        self.bindings.extend(later.bindings);
        self.assets.extend(later.assets);
    }
}

fn diff_map<T: Clone + PartialEq>(
    prev: &BTreeMap<String, T>,
    next: &BTreeMap<String, T>,
) -> BTreeMap<String, Option<T>> {
    let mut changes = BTreeMap::new();
    for (id, value) in next {
        if prev.get(id) != Some(value) {
            changes.insert(id.clone(), Some(value.clone()));
        }
    }
    for id in prev.keys() {
        if !next.contains_key(id) {
            changes.insert(id.clone(), None);
        }
    }
    changes
}

fn apply_map<T: Clone>(target: &mut BTreeMap<String, T>, changes: &BTreeMap<String, Option<T>>) {
    for (id, change) in changes {
        match change {
            Some(value) => {
                target.insert(id.clone(), value.clone());
            }
            None => {
                target.remove(id);
            }
        }
    }
}
