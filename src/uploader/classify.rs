use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

/// Upload category understood by the scenario upload endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    AmCsv,
    PmCsv,
    AttoutTxt,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::AmCsv, FileType::PmCsv, FileType::AttoutTxt];

    /// Value sent in the `file_type` form field
    pub fn as_tag(&self) -> &'static str {
        match self {
            FileType::AmCsv => "am_csv",
            FileType::PmCsv => "pm_csv",
            FileType::AttoutTxt => "attout_txt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileType::AmCsv => "AM CSV",
            FileType::PmCsv => "PM CSV",
            FileType::AttoutTxt => "ATTOUT TXT",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FileType::AmCsv | FileType::PmCsv => "text/csv",
            FileType::AttoutTxt => "text/plain",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_tag() == s)
            .ok_or_else(|| {
                AppError::validation("file_type", "Must be am_csv, pm_csv or attout_txt")
            })
    }
}

/// One user-selected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, keeping only its file name
    pub async fn from_path(path: &str) -> AppResult<Self> {
        InputValidator::validate_file_path(path)?;

        let data = tokio::fs::read(path).await?;
        let name = Path::new(path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self { name, data })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A classified file waiting in the upload queue
#[derive(Debug, Clone)]
pub struct QueuedFile {
    pub source: Arc<SourceFile>,
    pub file_type: FileType,
}

impl QueuedFile {
    pub fn new(source: SourceFile, file_type: FileType) -> Self {
        Self {
            source: Arc::new(source),
            file_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }
}

const PM_MARKERS: [&str; 3] = ["_pm", "pm_", " pm."];
const AM_MARKERS: [&str; 3] = ["_am", "am_", " am."];

/// Infer the upload type from a filename alone.
///
/// `.txt` files are always ATTOUT output. `.csv` files are split into AM and PM
/// counts by a cascade of case-insensitive substring checks where the first match
/// wins: delimited `pm` markers, then delimited `am` markers, then bare `pm`, then
/// bare `am`, falling back to AM. Any other extension is rejected.
pub fn classify(file_name: &str) -> AppResult<FileType> {
    let lowered = file_name.to_lowercase();

    let extension = match lowered.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => return Err(AppError::classification(file_name)),
    };

    match extension {
        "txt" => Ok(FileType::AttoutTxt),
        "csv" => Ok(classify_csv(&lowered)),
        _ => Err(AppError::classification(file_name)),
    }
}

fn classify_csv(lowered: &str) -> FileType {
    if has_marker(lowered, &PM_MARKERS, "pm_") {
        FileType::PmCsv
    } else if has_marker(lowered, &AM_MARKERS, "am_") {
        FileType::AmCsv
    } else if lowered.contains("pm") {
        FileType::PmCsv
    } else {
        // bare "am" and the fallback both land on AM
        FileType::AmCsv
    }
}

fn has_marker(lowered: &str, markers: &[&str], prefix: &str) -> bool {
    markers.iter().any(|m| lowered.contains(m)) || lowered.starts_with(prefix)
}

/// Classify a batch, keeping accepted files in their original order
pub fn classify_batch(files: Vec<SourceFile>) -> (Vec<QueuedFile>, Vec<String>) {
    let mut accepted = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for file in files {
        match classify(&file.name) {
            Ok(file_type) => {
                log::debug!("Classified {} as {}", file.name, file_type);
                accepted.push(QueuedFile::new(file, file_type));
            }
            Err(e) => {
                log::warn!("Rejected {}: {}", file.name, e);
                rejected.push(file.name);
            }
        }
    }

    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Option<&'static str> {
        classify(name).ok().map(|t| t.as_tag())
    }

    #[test]
    fn test_reference_examples() {
        assert_eq!(tag("AM_Volumes.csv"), Some("am_csv"));
        assert_eq!(tag("pm_volumes.csv"), Some("pm_csv"));
        assert_eq!(tag("volumes.csv"), Some("am_csv"));
        assert_eq!(tag("notes.txt"), Some("attout_txt"));
        assert_eq!(tag("report.pdf"), None);
    }

    #[test]
    fn test_txt_always_attout() {
        for name in ["ATTOUT.TXT", "pm_counts.txt", "am.txt", "x.y.txt"] {
            assert_eq!(classify(name).unwrap(), FileType::AttoutTxt, "{}", name);
        }
    }

    #[test]
    fn test_other_extensions_rejected() {
        for name in ["data.xlsx", "counts", "csv", "am_counts.csv.bak", ""] {
            match classify(name) {
                Err(AppError::Classification { file_name }) => assert_eq!(file_name, name),
                other => panic!("expected rejection for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_delimited_am_beats_bare_pm() {
        // rule 2 fires before the bare "pm" rule is reached
        assert_eq!(classify("trip_am_data.csv").unwrap(), FileType::AmCsv);
        assert_eq!(classify("pump_am_counts.csv").unwrap(), FileType::AmCsv);
    }

    #[test]
    fn test_delimited_pm_beats_delimited_am() {
        assert_eq!(classify("am_to_pm_shift.csv").unwrap(), FileType::PmCsv);
        assert_eq!(classify("Counts PM.csv").unwrap(), FileType::PmCsv);
        assert_eq!(classify("Counts AM.csv").unwrap(), FileType::AmCsv);
    }

    #[test]
    fn test_bare_substrings() {
        assert_eq!(classify("afternoonpm.csv").unwrap(), FileType::PmCsv);
        assert_eq!(classify("Sample.csv").unwrap(), FileType::AmCsv);
        assert_eq!(classify("counts.CSV").unwrap(), FileType::AmCsv);
    }

    #[test]
    fn test_batch_keeps_order_and_collects_rejections() {
        let files = vec![
            SourceFile::new("b_pm.csv", "1"),
            SourceFile::new("report.pdf", "2"),
            SourceFile::new("a.txt", "3"),
            SourceFile::new("image.png", "4"),
            SourceFile::new("c.csv", "5"),
        ];

        let (accepted, rejected) = classify_batch(files);
        let names: Vec<&str> = accepted.iter().map(|q| q.name()).collect();
        assert_eq!(names, vec!["b_pm.csv", "a.txt", "c.csv"]);
        assert_eq!(rejected, vec!["report.pdf".to_string(), "image.png".to_string()]);
    }

    #[test]
    fn test_tag_round_trip_through_from_str() {
        for t in FileType::ALL {
            assert_eq!(t.as_tag().parse::<FileType>().unwrap(), t);
        }
        assert!("csv".parse::<FileType>().is_err());
    }
}
