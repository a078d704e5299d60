use std::{
    fs,
    path::{Path, PathBuf},
};

/// テスト用の一時ディレクトリ。スコープを抜けると中身ごと削除する。
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    /// 一意な一時ディレクトリを作成する。
    pub fn new(label: &str) -> Self {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "toggl2asana-{}-{}-{}",
            label,
            std::process::id(),
            stamp
        ));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::TempDir;

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let dir = TempDir::new("drop");
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());

        drop(dir);

        assert!(!path.exists());
    }
}
