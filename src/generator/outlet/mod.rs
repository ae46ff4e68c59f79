use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub mod report_renderer;

pub use report_renderer::ReportRenderer;

/// 产物读取错误
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("invalid artifact name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 输出目录中的单个产物文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub size: u64,
    pub md5: String,
}

/// 单次运行的产物目录
#[derive(Debug, Clone)]
pub struct DiskOutlet {
    root: PathBuf,
}

impl DiskOutlet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 写入产物文件，返回完整路径；写入完成后文件即可被读取
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf, ArtifactError> {
        Self::check_name(name)?;
        fs::create_dir_all(&self.root)?;

        let output_file_path = self.root.join(name);
        fs::write(&output_file_path, content)?;

        tracing::info!("💾 已保存产物: {}", output_file_path.display());
        Ok(output_file_path)
    }

    /// 列出目录下的全部产物（按文件名排序）
    pub fn list(&self) -> Result<Vec<ArtifactEntry>, ArtifactError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let bytes = fs::read(entry.path())?;
            entries.push(ArtifactEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                size: bytes.len() as u64,
                md5: digest(&bytes),
            });
        }
        Ok(entries)
    }

    /// 读取指定产物
    pub fn read(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        Self::check_name(name)?;
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(ArtifactError::NotFound(name.to_string()));
        }
        Ok(fs::read(path)?)
    }

    /// 只允许目录内的普通文件名
    fn check_name(name: &str) -> Result<(), ArtifactError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }
        Ok(())
    }
}

/// 文件内容的MD5摘要
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// 按扩展名推断下载时的内容类型
pub fn content_type_for(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("html") => "text/html; charset=utf-8",
        Some("txt") | Some("md") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_list_read() {
        let temp_dir = TempDir::new().unwrap();
        let outlet = DiskOutlet::new(temp_dir.path().join("job"));

        outlet.write("b.json", "{}").unwrap();
        outlet.write("a.html", "<html></html>").unwrap();

        let entries = outlet.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.html");
        assert_eq!(entries[1].size, 2);
        assert_eq!(entries[1].md5, digest(b"{}"));

        assert_eq!(outlet.read("b.json").unwrap(), b"{}".to_vec());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let outlet = DiskOutlet::new(temp_dir.path());

        for name in ["../secret", "a/b.json", "a\\b.json", "", ".env"] {
            assert!(matches!(
                outlet.read(name),
                Err(ArtifactError::InvalidName(_))
            ));
        }
        assert!(matches!(
            outlet.read("missing.json"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let outlet = DiskOutlet::new("/nonexistent/rankx/job");
        assert!(outlet.list().unwrap().is_empty());
    }

    #[test]
    fn test_digest_known_value() {
        assert_eq!(digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("step_1.json"), "application/json");
        assert!(content_type_for("report.html").starts_with("text/html"));
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
