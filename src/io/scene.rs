use crate::types::{SstError, SstResult};
use std::path::{Path, PathBuf};

const MTL_SUFFIX: &str = "_MTL.txt";
const QA_PIXEL_SUFFIX: &str = "_QA_PIXEL.TIF";

/// Files making up one Collection-2 Level-2 scene directory
#[derive(Debug, Clone)]
pub struct SceneFiles {
    pub dir: PathBuf,
    pub metadata: PathBuf,
    pub qa_pixel: PathBuf,
    entries: Vec<PathBuf>,
}

impl SceneFiles {
    /// Locate the metadata and QA files in `dir`
    pub fn discover<P: AsRef<Path>>(dir: P) -> SstResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        log::info!("Scanning scene directory: {}", dir.display());

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() {
                entries.push(path);
            }
        }
        entries.sort();
        log::debug!("Found {} files", entries.len());

        let metadata = find_by_suffix(&entries, MTL_SUFFIX)?;
        let qa_pixel = find_by_suffix(&entries, QA_PIXEL_SUFFIX)?;

        Ok(Self {
            dir,
            metadata,
            qa_pixel,
            entries,
        })
    }

    /// Surface temperature raster for thermal `band`
    pub fn thermal_band(&self, band: u8) -> SstResult<PathBuf> {
        find_by_suffix(&self.entries, &format!("_ST_B{}.TIF", band))
    }
}

fn find_by_suffix(entries: &[PathBuf], suffix: &str) -> SstResult<PathBuf> {
    let suffix_upper = suffix.to_uppercase();
    let matches: Vec<&PathBuf> = entries
        .iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_uppercase().ends_with(&suffix_upper))
                .unwrap_or(false)
        })
        .collect();

    match matches.as_slice() {
        [] => Err(SstError::MissingFile(format!("no file ending in {}", suffix))),
        [only] => Ok((*only).clone()),
        [first, ..] => {
            log::warn!(
                "{} files end in {}, using {}",
                matches.len(),
                suffix,
                first.display()
            );
            Ok((*first).clone())
        }
    }
}
