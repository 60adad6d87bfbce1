// Clinic profile and asset loading

use std::io::Read;
use std::path::Path;

use ::image::DynamicImage;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::render::canvas::RgbColor;

/// Branding and contact details printed on every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicProfile {
    /// Prefix of generated file names.
    pub prefix: String,
    pub address_lines: Vec<String>,
    pub website: String,
    pub brand_color: [u8; 3],
    /// Logo file path or http(s) URL.
    pub logo: Option<String>,
}

impl Default for ClinicProfile {
    fn default() -> Self {
        Self {
            prefix: "RevitaClinic".to_string(),
            address_lines: vec![
                "Clausewitzstr. 2".to_string(),
                "10629 Berlin-Charlottenburg".to_string(),
                "+49 30 6633110".to_string(),
                "info@revitaclinic.de".to_string(),
            ],
            website: "www.revitaclinic.de".to_string(),
            brand_color: [38, 96, 65],
            logo: None,
        }
    }
}

impl ClinicProfile {
    /// Read a profile from a JSON file. Missing keys take the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Input(format!("{}: {}", path.display(), e)))?;
        let profile: ClinicProfile = serde_json::from_str(&content)
            .map_err(|e| Error::Input(format!("Invalid clinic profile: {}", e)))?;
        info!("Loaded clinic profile from {}", path.display());
        Ok(profile)
    }

    pub fn brand(&self) -> RgbColor {
        let [r, g, b] = self.brand_color;
        RgbColor(r, g, b)
    }

    /// `<prefix>_<kind>_<patient>.pdf`, with the patient name made file-safe.
    pub fn output_file_name(&self, kind: &str, patient_name: &str) -> String {
        let sanitized: String = patient_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        format!("{}_{}_{}.pdf", self.prefix, kind, sanitized)
    }
}

/// Load the logo from a file or an http(s) URL.
pub fn load_logo(source: &str) -> Result<DynamicImage> {
    let image_bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let response = ureq::get(source)
            .call()
            .map_err(|e| Error::AssetMissing(format!("Failed to fetch logo: {}", e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| Error::AssetMissing(format!("Failed to read logo response: {}", e)))?;
        bytes
    } else {
        std::fs::read(source).map_err(|e| Error::AssetMissing(format!("{}: {}", source, e)))?
    };

    ::image::load_from_memory(&image_bytes)
        .map_err(|e| Error::AssetMissing(format!("Failed to decode logo: {}", e)))
}

/// Like [`load_logo`], but a missing logo only costs the logo.
pub fn load_logo_or_skip(source: Option<&str>) -> Option<DynamicImage> {
    let source = source?;
    match load_logo(source) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("{}; rendering without logo", e);
            None
        }
    }
}
