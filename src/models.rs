use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::camera::Vec3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Species {
    #[default]
    Kapok,
    Mahogany,
    Rubber,
    BrazilNut,
    Acai,
    Cocoa,
    Rosewood,
    AndeanAlder,
    Ironwood,
    Cecropia,
}

impl Species {
    pub const ALL: [Species; 10] = [
        Species::Kapok,
        Species::Mahogany,
        Species::Rubber,
        Species::BrazilNut,
        Species::Acai,
        Species::Cocoa,
        Species::Rosewood,
        Species::AndeanAlder,
        Species::Ironwood,
        Species::Cecropia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Kapok => "KAPOK",
            Species::Mahogany => "MAHOGANY",
            Species::Rubber => "RUBBER",
            Species::BrazilNut => "BRAZIL_NUT",
            Species::Acai => "ACAI",
            Species::Cocoa => "COCOA",
            Species::Rosewood => "ROSEWOOD",
            Species::AndeanAlder => "ANDEAN_ALDER",
            Species::Ironwood => "IRONWOOD",
            Species::Cecropia => "CECROPIA",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Species::ALL.iter().copied().find(|sp| sp.as_str() == s)
    }

    /// Human label, same wording the backend returns as `tree_type_display`
    pub fn label(&self) -> &'static str {
        match self {
            Species::Kapok => "Kapok Tree",
            Species::Mahogany => "Mahogany Tree",
            Species::Rubber => "Rubber Tree",
            Species::BrazilNut => "Brazil Nut Tree",
            Species::Acai => "Açaí Palm",
            Species::Cocoa => "Cocoa Tree",
            Species::Rosewood => "Rosewood",
            Species::AndeanAlder => "Andean Alder",
            Species::Ironwood => "Ironwood",
            Species::Cecropia => "Cecropia",
        }
    }

    /// Accent color shown next to the species in the plant form picker
    pub fn accent_color(&self) -> &'static str {
        match self {
            Species::Kapok => "#22C55E",
            Species::Mahogany => "#16A34A",
            Species::Rubber => "#15803D",
            Species::BrazilNut => "#CA8A04",
            Species::Acai => "#DC2626",
            Species::Cocoa => "#7C2D12",
            Species::Rosewood => "#BE123C",
            Species::AndeanAlder => "#0EA5E9",
            Species::Ironwood => "#57534E",
            Species::Cecropia => "#65A30D",
        }
    }

    pub fn visuals(&self) -> SpeciesVisuals {
        let (trunk_color, foliage_color, height, trunk_width, foliage_size) = match self {
            Species::Kapok => ("#8B4513", "#22C55E", 1.2, 0.1, 0.5),
            Species::Mahogany => ("#654321", "#166534", 1.0, 0.12, 0.4),
            Species::Rubber => ("#A0522D", "#15803D", 0.9, 0.08, 0.45),
            Species::BrazilNut => ("#8B5A2B", "#CA8A04", 1.3, 0.15, 0.6),
            Species::Acai => ("#D2691E", "#DC2626", 0.8, 0.06, 0.3),
            Species::Cocoa => ("#7C2D12", "#7C2D12", 0.7, 0.07, 0.35),
            Species::Rosewood => ("#BE123C", "#BE123C", 1.1, 0.11, 0.4),
            Species::AndeanAlder => ("#0EA5E9", "#0EA5E9", 1.0, 0.09, 0.42),
            Species::Ironwood => ("#57534E", "#57534E", 0.9, 0.13, 0.38),
            Species::Cecropia => ("#65A30D", "#65A30D", 0.8, 0.05, 0.32),
        };
        SpeciesVisuals { trunk_color, foliage_color, height, trunk_width, foliage_size }
    }

    /// Extra crown pieces drawn on top of the main crown sphere.
    /// Offsets are relative to the crown centre.
    pub fn foliage_layers(&self) -> &'static [FoliageLayer] {
        const fn layer(offset: [f32; 3], scale: f32, color: &'static str, shape: CrownShape) -> FoliageLayer {
            FoliageLayer { offset, scale, color, shape }
        }
        const KAPOK: [FoliageLayer; 2] = [
            layer([0.1, 0.1, 0.05], 0.7, "#16A34A", CrownShape::Sphere),
            layer([-0.08, 0.15, -0.03], 0.6, "#15803D", CrownShape::Sphere),
        ];
        const MAHOGANY: [FoliageLayer; 1] = [
            layer([0.15, -0.05, 0.0], 0.8, "#14532D", CrownShape::Sphere),
        ];
        const BRAZIL_NUT: [FoliageLayer; 2] = [
            layer([0.0, 0.2, 0.0], 0.9, "#CA8A04", CrownShape::Sphere),
            layer([0.2, 0.0, 0.1], 0.5, "#EAB308", CrownShape::Sphere),
        ];
        const RUBBER: [FoliageLayer; 1] = [
            layer([0.0, 0.0, 0.0], 1.0, "#15803D", CrownShape::Cone),
        ];
        const ACAI: [FoliageLayer; 2] = [
            layer([0.0, 0.1, 0.0], 0.8, "#DC2626", CrownShape::Sphere),
            layer([0.1, -0.1, 0.05], 0.4, "#EF4444", CrownShape::Sphere),
        ];
        const COCOA: [FoliageLayer; 1] = [
            layer([0.0, 0.0, 0.0], 1.0, "#7C2D12", CrownShape::Box),
        ];

        match self {
            Species::Kapok => &KAPOK,
            Species::Mahogany => &MAHOGANY,
            Species::BrazilNut => &BRAZIL_NUT,
            Species::Rubber => &RUBBER,
            Species::Acai => &ACAI,
            Species::Cocoa => &COCOA,
            Species::Rosewood | Species::AndeanAlder | Species::Ironwood | Species::Cecropia => &[],
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trunk color used while a tree is hovered
pub const HOVER_TRUNK_COLOR: &str = "#654321";
/// Crown color used while a tree is hovered
pub const HOVER_CROWN_COLOR: &str = "#38b82e";

/// Rendering parameters for one species
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeciesVisuals {
    pub trunk_color: &'static str,
    pub foliage_color: &'static str,
    pub height: f32,
    pub trunk_width: f32,
    pub foliage_size: f32,
}

impl SpeciesVisuals {
    pub fn trunk_height(&self) -> f32 {
        self.height * 0.4
    }

    /// Height of the crown centre above the ground
    pub fn crown_y(&self) -> f32 {
        self.trunk_height() + self.foliage_size * 0.3
    }

    pub fn trunk_color(&self, hovered: bool) -> &'static str {
        if hovered { HOVER_TRUNK_COLOR } else { self.trunk_color }
    }

    pub fn foliage_color(&self, hovered: bool) -> &'static str {
        if hovered { HOVER_CROWN_COLOR } else { self.foliage_color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrownShape {
    Sphere,
    Cone,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FoliageLayer {
    pub offset: [f32; 3],
    /// Multiplier on the species foliage size
    pub scale: f32,
    pub color: &'static str,
    pub shape: CrownShape,
}

/// A planted tree as served by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub id: i64,
    pub name: String,
    pub tree_type: Species,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_type_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planter: Option<i64>,
    #[serde(default)]
    pub planter_name: String,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_z: f64,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub planted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_real_tree_planted: bool,
}

impl Tree {
    /// Placement on the forest floor; y is always 0
    pub fn ground_position(&self) -> Vec3 {
        Vec3::new(self.position_x as f32, 0.0, self.position_z as f32)
    }

    /// Backend label if it sent one, otherwise our own
    pub fn species_label(&self) -> &str {
        self.tree_type_display.as_deref().unwrap_or_else(|| self.tree_type.label())
    }
}

/// RFC 3339, or a zone-less timestamp taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// `planted_at` is display-only; a bad value must not drop the tree
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                log::warn!("[Api] Ignoring unparseable planted_at '{}'", raw);
            }
            parsed
        }
        Some(other) => {
            log::warn!("[Api] Ignoring non-string planted_at {}", other);
            None
        }
    };
    Ok(parsed)
}

/// Planter projection returned in the `users` search bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub trees_planted: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResultSet {
    pub trees: Vec<Tree>,
    pub users: Vec<User>,
}

impl SearchResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty() && self.users.is_empty()
    }
}

/// A single selectable row in the search results panel
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
    Tree(Tree),
    User(User),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanterRank {
    pub name: String,
    pub trees_planted: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ForestStats {
    pub total_trees: u64,
    #[serde(default)]
    pub real_trees_planted: u64,
    #[serde(default)]
    pub top_planters: Vec<PlanterRank>,
}
