//! Material catalog: the closed set of items the depot can contain.
//!
//! A catalog is loaded once from a JSON manifest that lists every entry with
//! its icon, plus the `depotOrder` array that fixes the order in which items
//! appear in the in-game depot. Icons and tier frames are PNG files resolved
//! relative to the manifest.

use anyhow::{Context, Result, anyhow, bail, ensure};
use image::{RgbaImage, imageops};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Index of an entry inside its catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

/// One collectible item.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub id: EntryId,
    /// Stable key used by the manifest and in exported results.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Rarity tier, 1 to 5.
    pub tier: u8,
    /// Position hint (column, row) from the manifest. Informational only.
    pub position: (u32, u32),
    /// Item artwork with alpha.
    pub icon: RgbaImage,
    /// Tier-coloured frame drawn behind the icon, if the manifest provides one.
    pub frame: Option<RgbaImage>,
}

impl CatalogEntry {
    pub fn new(key: &str, name: &str, tier: u8, icon: RgbaImage) -> Self {
        Self {
            id: EntryId(0),
            key: key.to_string(),
            name: name.to_string(),
            tier,
            position: (0, 0),
            icon,
            frame: None,
        }
    }

    pub fn with_frame(mut self, frame: RgbaImage) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Offset of the icon inside the reference canvas.
    pub fn icon_offset(&self) -> (u32, u32) {
        match &self.frame {
            Some(frame) => (
                frame.width().saturating_sub(self.icon.width()) / 2,
                frame.height().saturating_sub(self.icon.height()) / 2,
            ),
            None => (0, 0),
        }
    }

    /// The image the depot is expected to show for this entry: the tier frame
    /// with the icon alpha-composited onto its centre, or the icon alone.
    pub fn reference_image(&self) -> RgbaImage {
        match &self.frame {
            Some(frame) => {
                let mut canvas = frame.clone();
                let (ox, oy) = self.icon_offset();
                imageops::overlay(&mut canvas, &self.icon, ox as i64, oy as i64);
                canvas
            }
            None => self.icon.clone(),
        }
    }
}

/// Immutable catalog plus the order items appear in the depot.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    scan_order: Vec<EntryId>,
}

impl Catalog {
    /// Builds a catalog in memory. Entry ids are reassigned to their index and
    /// `depot_order` refers to entries by key.
    pub fn from_entries<S: AsRef<str>>(
        mut entries: Vec<CatalogEntry>,
        depot_order: &[S],
    ) -> Result<Self> {
        let mut by_key = HashMap::new();
        for (index, entry) in entries.iter_mut().enumerate() {
            ensure!(
                (1..=5).contains(&entry.tier),
                "Entry '{}' has invalid tier {}",
                entry.key,
                entry.tier
            );
            entry.id = EntryId(index);
            if by_key.insert(entry.key.clone(), entry.id).is_some() {
                bail!("Duplicate catalog entry '{}'", entry.key);
            }
        }

        let mut seen = HashSet::new();
        let mut scan_order = Vec::with_capacity(depot_order.len());
        for key in depot_order {
            let key = key.as_ref();
            let id = *by_key
                .get(key)
                .ok_or_else(|| anyhow!("depotOrder references unknown entry '{}'", key))?;
            if !seen.insert(id) {
                bail!("depotOrder lists '{}' more than once", key);
            }
            scan_order.push(id);
        }

        Ok(Self {
            entries,
            scan_order,
        })
    }

    /// Loads a catalog manifest and every image it references.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let manifest: CatalogManifest = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut frames = HashMap::new();
        for (tier, file) in &manifest.frames {
            let tier: u8 = tier
                .parse()
                .with_context(|| format!("Invalid frame tier '{}'", tier))?;
            frames.insert(tier, load_rgba(&base.join(file))?);
        }

        let mut entries = Vec::with_capacity(manifest.entries.len());
        for item in manifest.entries {
            let icon = load_rgba(&base.join(&item.icon))?;
            let mut entry = CatalogEntry::new(&item.id, &item.name, item.tier, icon);
            entry.position = (item.position[0], item.position[1]);
            entry.frame = frames.get(&item.tier).cloned();
            entries.push(entry);
        }

        let catalog = Self::from_entries(entries, &manifest.depot_order)?;
        crate::log(&format!(
            "Catalog loaded: {} entries, {} in depot order ({})",
            catalog.entries.len(),
            catalog.scan_order.len(),
            path.display()
        ));
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> &CatalogEntry {
        &self.entries[id.0]
    }

    pub fn get(&self, id: EntryId) -> Option<&CatalogEntry> {
        self.entries.get(id.0)
    }

    pub fn by_key(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Entries in the order they appear in the depot.
    pub fn scan_order(&self) -> &[EntryId] {
        &self.scan_order
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogManifest {
    entries: Vec<ManifestEntry>,
    depot_order: Vec<String>,
    /// Tier ("1".."5") to frame image path.
    #[serde(default)]
    frames: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    name: String,
    tier: u8,
    icon: String,
    #[serde(default)]
    position: [u32; 2],
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("Failed to load image {}", path.display()))?
        .to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(c))
    }

    #[test]
    fn test_from_entries_assigns_ids_and_order() {
        let entries = vec![
            CatalogEntry::new("a", "Alpha", 1, solid(4, 4, [1, 2, 3, 255])),
            CatalogEntry::new("b", "Beta", 2, solid(4, 4, [4, 5, 6, 255])),
            CatalogEntry::new("c", "Gamma", 3, solid(4, 4, [7, 8, 9, 255])),
        ];
        let catalog = Catalog::from_entries(entries, &["c", "a"]).unwrap();

        assert_eq!(catalog.entries().len(), 3);
        assert_eq!(catalog.scan_order(), &[EntryId(2), EntryId(0)]);
        assert_eq!(catalog.entry(EntryId(1)).name, "Beta");
        assert_eq!(catalog.by_key("c").unwrap().id, EntryId(2));
    }

    #[test]
    fn test_from_entries_rejects_unknown_and_duplicates() {
        let make = || vec![CatalogEntry::new("a", "Alpha", 1, solid(2, 2, [0, 0, 0, 255]))];
        assert!(Catalog::from_entries(make(), &["missing"]).is_err());
        assert!(Catalog::from_entries(make(), &["a", "a"]).is_err());

        let mut bad_tier = make();
        bad_tier[0].tier = 9;
        assert!(Catalog::from_entries(bad_tier, &["a"]).is_err());
    }

    #[test]
    fn test_reference_image_composites_icon_onto_frame() {
        let frame = solid(10, 10, [200, 0, 0, 255]);
        let mut icon = solid(4, 4, [0, 0, 255, 255]);
        icon.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let entry = CatalogEntry::new("a", "Alpha", 3, icon).with_frame(frame);

        assert_eq!(entry.icon_offset(), (3, 3));
        let reference = entry.reference_image();
        assert_eq!(reference.dimensions(), (10, 10));
        assert_eq!(reference.get_pixel(0, 0).0, [200, 0, 0, 255]);
        assert_eq!(reference.get_pixel(5, 5).0, [0, 0, 255, 255]);
        // Transparent icon pixel keeps the frame underneath
        assert_eq!(reference.get_pixel(3, 3).0, [200, 0, 0, 255]);
    }

    #[test]
    fn test_load_manifest_with_frames() {
        let dir = tempdir().unwrap();
        solid(6, 6, [10, 20, 30, 255]).save(dir.path().join("a.png")).unwrap();
        solid(6, 6, [40, 50, 60, 255]).save(dir.path().join("b.png")).unwrap();
        solid(12, 12, [90, 90, 90, 255]).save(dir.path().join("t2.png")).unwrap();

        let manifest = r#"{
            "entries": [
                {"id": "a", "name": "Alpha", "tier": 1, "icon": "a.png", "position": [0, 1]},
                {"id": "b", "name": "Beta", "tier": 2, "icon": "b.png"}
            ],
            "depotOrder": ["b", "a"],
            "frames": {"2": "t2.png"}
        }"#;
        let path = dir.path().join("catalog.json");
        fs::write(&path, manifest).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.scan_order(), &[EntryId(1), EntryId(0)]);
        assert!(catalog.entry(EntryId(0)).frame.is_none());
        assert_eq!(catalog.entry(EntryId(0)).position, (0, 1));
        let beta = catalog.entry(EntryId(1));
        assert_eq!(beta.frame.as_ref().unwrap().dimensions(), (12, 12));
        assert_eq!(beta.reference_image().get_pixel(6, 6).0, [40, 50, 60, 255]);
    }

    #[test]
    fn test_load_reports_missing_icon() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{"entries":[{"id":"a","name":"A","tier":1,"icon":"nope.png"}],"depotOrder":["a"]}"#,
        )
        .unwrap();

        let err = Catalog::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.png"));
    }
}
