// Application settings
// Loaded from ~/.config/boqsheet/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Sheet
    #[serde(rename = "sheet.name")]
    pub sheet_name: String,

    #[serde(rename = "sheet.title")]
    pub title: Option<String>, // None = no title row

    // Header labels
    #[serde(rename = "labels.name")]
    pub label_name: String,

    #[serde(rename = "labels.unit")]
    pub label_unit: String,

    #[serde(rename = "labels.unitPrice")]
    pub label_unit_price: String,

    #[serde(rename = "labels.quantitySum")]
    pub label_quantity_sum: String,

    #[serde(rename = "labels.totalPrice")]
    pub label_total_price: String,

    #[serde(rename = "labels.grandTotal")]
    pub label_grand_total: String,

    // Colours ("#RRGGBB")
    #[serde(rename = "style.headerColor")]
    pub header_color: String,

    #[serde(rename = "style.headerFontColor")]
    pub header_font_color: String,

    #[serde(rename = "style.totalColor")]
    pub total_color: String,

    // Number formats
    #[serde(rename = "format.quantityDecimals")]
    pub quantity_decimals: u8,

    #[serde(rename = "format.priceDecimals")]
    pub price_decimals: u8,

    // Column widths (characters)
    #[serde(rename = "columns.minWidth")]
    pub min_col_width: f64,

    #[serde(rename = "columns.maxWidth")]
    pub max_col_width: f64,

    // Output
    #[serde(rename = "output.directory")]
    pub output_directory: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet_name: "Combined BoQ".into(),
            title: None,
            label_name: "Name".into(),
            label_unit: "Unit".into(),
            label_unit_price: "Unit price".into(),
            label_quantity_sum: "Total quantity".into(),
            label_total_price: "Total price".into(),
            label_grand_total: "TOTAL".into(),
            header_color: "#2196F3".into(),
            header_font_color: "#FFFFFF".into(),
            total_color: "#4CAF50".into(),
            quantity_decimals: 2,
            price_decimals: 2,
            min_col_width: 8.0,
            max_col_width: 60.0,
            output_directory: None,
        }
    }
}

/// Parse "#RRGGBB" (or "RRGGBB") into 0xRRGGBB.
pub fn parse_hex_color(s: &str) -> Option<u32> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("boqsheet")
            .join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "invalid settings file; using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read settings file; using defaults");
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn header_color_rgb(&self) -> u32 {
        parse_hex_color(&self.header_color).unwrap_or(0x2196F3)
    }

    pub fn header_font_color_rgb(&self) -> u32 {
        parse_hex_color(&self.header_font_color).unwrap_or(0xFFFFFF)
    }

    pub fn total_color_rgb(&self) -> u32 {
        parse_hex_color(&self.total_color).unwrap_or(0x4CAF50)
    }

    /// Column width bounds, swapped if configured the wrong way round.
    pub fn col_width_bounds(&self) -> (f64, f64) {
        let (lo, hi) = (self.min_col_width.max(1.0), self.max_col_width.max(1.0));
        if lo <= hi { (lo, hi) } else { (hi, lo) }
    }
}
