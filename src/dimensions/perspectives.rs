use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the eight cultural lenses a work is rated under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CulturalPerspective {
    Western,
    Eastern,
    African,
    LatinAmerican,
    MiddleEastern,
    SouthAsian,
    Oceanic,
    Indigenous,
}

impl CulturalPerspective {
    pub const ALL: [CulturalPerspective; 8] = [
        CulturalPerspective::Western,
        CulturalPerspective::Eastern,
        CulturalPerspective::African,
        CulturalPerspective::LatinAmerican,
        CulturalPerspective::MiddleEastern,
        CulturalPerspective::SouthAsian,
        CulturalPerspective::Oceanic,
        CulturalPerspective::Indigenous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CulturalPerspective::Western => "western",
            CulturalPerspective::Eastern => "eastern",
            CulturalPerspective::African => "african",
            CulturalPerspective::LatinAmerican => "latin_american",
            CulturalPerspective::MiddleEastern => "middle_eastern",
            CulturalPerspective::SouthAsian => "south_asian",
            CulturalPerspective::Oceanic => "oceanic",
            CulturalPerspective::Indigenous => "indigenous",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CulturalPerspective::Western => "Western",
            CulturalPerspective::Eastern => "Eastern",
            CulturalPerspective::African => "African",
            CulturalPerspective::LatinAmerican => "Latin American",
            CulturalPerspective::MiddleEastern => "Middle Eastern",
            CulturalPerspective::SouthAsian => "South Asian",
            CulturalPerspective::Oceanic => "Oceanic",
            CulturalPerspective::Indigenous => "Indigenous",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CulturalPerspective::Western => "European and North American aesthetic traditions",
            CulturalPerspective::Eastern => "East Asian aesthetics, harmony and restraint",
            CulturalPerspective::African => "African artistic heritage, rhythm and communal meaning",
            CulturalPerspective::LatinAmerican => "Latin American traditions, magical realism and vivid expression",
            CulturalPerspective::MiddleEastern => "Middle Eastern traditions, geometry and calligraphy",
            CulturalPerspective::SouthAsian => "South Asian traditions, rasa theory and devotional art",
            CulturalPerspective::Oceanic => "Pacific Island traditions, navigation and ancestral narrative",
            CulturalPerspective::Indigenous => "Indigenous knowledge systems, land and oral tradition",
        }
    }
}

impl std::fmt::Display for CulturalPerspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CulturalPerspective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_lowercase().replace([' ', '-'], "_");
        CulturalPerspective::ALL
            .into_iter()
            .find(|p| p.as_str() == folded)
            .ok_or_else(|| format!("unknown cultural perspective '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_perspective_surface_forms() {
        assert_eq!("latin_american".parse::<CulturalPerspective>().unwrap(), CulturalPerspective::LatinAmerican);
        assert_eq!("Middle Eastern".parse::<CulturalPerspective>().unwrap(), CulturalPerspective::MiddleEastern);
        assert!("martian".parse::<CulturalPerspective>().is_err());
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for p in CulturalPerspective::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
        }
    }
}
