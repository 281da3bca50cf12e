//! Furnishing list domain types

pub mod schema;

use serde::{Deserialize, Serialize};

pub use schema::{validate_items, PathSegment, ValidationIssue};

/// Furnishing categories the model is asked to cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[serde(alias = "sofa-cover")]
    SofaCover,
    Rug,
    #[serde(alias = "coffee-table")]
    CoffeeTable,
    #[serde(alias = "side-table")]
    SideTable,
    #[serde(alias = "ceiling-light")]
    CeilingLight,
    #[serde(alias = "floor-lamp")]
    FloorLamp,
    Curtain,
    #[serde(alias = "wall-art")]
    WallArt,
    #[serde(alias = "pillows-throw")]
    PillowsThrow,
    #[serde(alias = "decor-plants")]
    DecorPlants,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::SofaCover,
        Category::Rug,
        Category::CoffeeTable,
        Category::SideTable,
        Category::CeilingLight,
        Category::FloorLamp,
        Category::Curtain,
        Category::WallArt,
        Category::PillowsThrow,
        Category::DecorPlants,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SofaCover => "sofa_cover",
            Category::Rug => "rug",
            Category::CoffeeTable => "coffee_table",
            Category::SideTable => "side_table",
            Category::CeilingLight => "ceiling_light",
            Category::FloorLamp => "floor_lamp",
            Category::Curtain => "curtain",
            Category::WallArt => "wall_art",
            Category::PillowsThrow => "pillows_throw",
            Category::DecorPlants => "decor_plants",
        }
    }

    /// Parse a wire tag; hyphenated spellings are accepted too.
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = tag.replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
    }
}

/// Search keywords per marketplace (Tmall, JD, Pinduoduo)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerms {
    pub tmall: String,
    pub jd: String,
    pub pdd: String,
}

/// One recommended purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnishingItem {
    pub category: Category,
    pub title: String,
    pub spec: String,
    pub tips: String,
    pub search_terms: SearchTerms,
}
