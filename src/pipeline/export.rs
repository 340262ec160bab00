//! Artifact files: `<output_dir>/<EBD key>.<extension>`.

use crate::config::ExportType;
use crate::model::EbdTable;
use std::path::{Path, PathBuf};

/// Serialise a table the way it is stored in `.json` artifacts.
///
/// Two-space indentation, fields in declaration (alphabetical) order,
/// non-ASCII text kept as is, trailing newline. The same table always yields
/// the same bytes.
pub fn table_to_json(table: &EbdTable) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(table)?;
    json.push('\n');
    Ok(json)
}

/// Write one artifact atomically (temp file + rename) and return its path.
///
/// A reader never sees a half-written file, and an existing artifact of the
/// same name is replaced only once the new content is complete.
pub async fn write_artifact(
    dir: &Path,
    ebd_key: &str,
    export_type: ExportType,
    contents: &str,
) -> std::io::Result<PathBuf> {
    let path = export_type.path_for(dir, ebd_key);
    let tmp_path = dir.join(format!(".{}.{}.tmp", ebd_key, export_type.extension()));
    tokio::fs::write(&tmp_path, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EbdChapterInformation;

    fn chapter() -> EbdChapterInformation {
        EbdChapterInformation {
            chapter: 6,
            chapter_title: "GPKE".into(),
            section: 8,
            section_title: "AD: Stammdatensynchronisation".into(),
            subsection: 1,
            subsection_title: "E_0401_Stammdaten prüfen".into(),
        }
    }

    #[test]
    fn json_is_pretty_sorted_and_keeps_umlauts() {
        let table = EbdTable::metadata_only(
            "E_0401",
            "Stammdaten prüfen",
            &chapter(),
            "Derzeit ist für diese Entscheidung kein Entscheidungsbaum notwendig.",
        );
        let json = table_to_json(&table).unwrap();
        assert!(json.starts_with("{\n  \"metadata\": {\n    \"chapter\": \"GPKE\""));
        assert!(json.contains("Stammdaten prüfen"));
        assert!(json.contains("\"rows\": []"));
        assert!(json.ends_with("}\n"));
        let ebd_code = json.find("\"ebd_code\"").unwrap();
        let role = json.find("\"role\"").unwrap();
        assert!(ebd_code < role);
    }

    #[tokio::test]
    async fn artifact_is_written_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "E_0003", ExportType::Dot, "digraph D {}\n")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("E_0003.dot"));

        write_artifact(dir.path(), "E_0003", ExportType::Dot, "digraph D { a }\n")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "digraph D { a }\n");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(write_artifact(&missing, "E_0003", ExportType::Json, "{}").await.is_err());
    }
}
