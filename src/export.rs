//! CSV export of a panel's metric table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::{analysis::AnalysisType, format::TableRow};

/// Where an export taken at `at` is written.
pub fn export_path(dir: Option<&Path>, analysis: AnalysisType, at: DateTime<Local>) -> PathBuf {
    let mut path = dir
        .map(Path::to_path_buf)
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(format!(
        "rms_{}_{}.csv",
        analysis.key(),
        at.format("%Y%m%d_%H%M%S")
    ));
    path
}

/// `path`, or the first free `<stem>_<n>.<ext>` beside it.
pub fn available_path(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{}_{}{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Write `Metric,Value` rows to `path`.
pub fn write_table(path: &Path, rows: &[TableRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(["Metric", "Value"])?;
    for (label, value) in rows {
        wtr.write_record([label, value])?;
    }
    wtr.flush().context("Failed to flush CSV export")?;
    Ok(())
}

/// Export on a blocking worker so the caller's thread never does file IO.
pub async fn export_table(
    dir: Option<PathBuf>,
    analysis: AnalysisType,
    rows: Vec<TableRow>,
) -> Result<PathBuf> {
    let planned = export_path(dir.as_deref(), analysis, Local::now());
    let path = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let path = available_path(planned);
        write_table(&path, &rows)?;
        Ok(path)
    })
    .await
    .context("Export worker panicked")??;
    tracing::info!(path = %path.display(), %analysis, "Exported table");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rows() -> Vec<TableRow> {
        vec![
            ("totalRevenue".to_string(), "1000".to_string()),
            ("paymentMethodRevenue.card".to_string(), "600".to_string()),
            ("note".to_string(), "has, comma".to_string()),
        ]
    }

    #[test]
    fn test_export_path_uses_key_and_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 6, 15, 14, 30, 5).unwrap();
        let path = export_path(Some(Path::new("/tmp/out")), AnalysisType::RevenueAnalysis, at);
        assert_eq!(
            path,
            PathBuf::from("/tmp/out/rms_revenue_analysis_20240615_143005.csv")
        );
    }

    #[test]
    fn test_write_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        write_table(&path, &rows()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Metric");
        assert_eq!(&headers[1], "Value");

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[2][1], "has, comma");
    }

    #[test]
    fn test_write_table_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("export.csv");
        assert!(write_table(&path, &rows()).is_err());
    }

    #[tokio::test]
    async fn test_export_table_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_table(
            Some(dir.path().to_path_buf()),
            AnalysisType::PeakDining,
            rows(),
        )
        .await
        .unwrap();

        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
    }

    #[test]
    fn test_available_path_adds_suffix_when_taken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rms_peak_dining_20240615_143005.csv");
        assert_eq!(available_path(path.clone()), path);

        std::fs::write(&path, "").unwrap();
        let second = dir.path().join("rms_peak_dining_20240615_143005_1.csv");
        assert_eq!(available_path(path.clone()), second);

        std::fs::write(&second, "").unwrap();
        assert_eq!(
            available_path(path),
            dir.path().join("rms_peak_dining_20240615_143005_2.csv")
        );
    }

    #[tokio::test]
    async fn test_back_to_back_exports_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let first = export_table(Some(dir.path().to_path_buf()), AnalysisType::MenuAnalysis, rows())
            .await
            .unwrap();
        let second = export_table(Some(dir.path().to_path_buf()), AnalysisType::MenuAnalysis, rows())
            .await
            .unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }
}
