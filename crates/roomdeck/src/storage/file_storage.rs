use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataPath {
    base: PathBuf,
}

impl DataPath {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref().to_path_buf();
        Self { base }
    }

    pub fn default_base() -> Option<PathBuf> {
        dirs::data_local_dir().map(|pb| pb.join("roomdeck"))
    }

    pub fn default_base_or_cwd() -> PathBuf {
        Self::default_base().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn rel_path(&self, typ: DataPathType) -> PathBuf {
        match typ {
            DataPathType::Log => PathBuf::from("logs"),
            DataPathType::Setting => PathBuf::from("settings"),
            DataPathType::Cache => PathBuf::from("cache"),
            DataPathType::ModelCache => PathBuf::from("cache").join("models"),
            DataPathType::Rooms => PathBuf::from("storage").join("rooms"),
        }
    }

    pub fn path(&self, typ: DataPathType) -> PathBuf {
        self.base.join(self.rel_path(typ))
    }
}

impl Default for DataPath {
    fn default() -> Self {
        Self::new(Self::default_base_or_cwd())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataPathType {
    Log,
    Setting,
    Cache,
    ModelCache,
    Rooms,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Directory {
    pub file_path: PathBuf,
}

impl Directory {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    /// Get the files in the current directory where the key is the file name and the value is the file contents
    pub fn get_files(&self) -> Result<HashMap<String, String>> {
        let dir = fs::read_dir(&self.file_path)?;
        let map = dir
            .filter_map(|f| f.ok())
            .filter(|f| f.path().is_file())
            .filter_map(|f| {
                let file_name = f.file_name().into_string().ok()?;
                let contents = fs::read_to_string(f.path()).ok()?;
                Some((file_name, contents))
            })
            .collect();

        Ok(map)
    }

    pub fn get_file_names(&self) -> Result<Vec<String>> {
        let dir = fs::read_dir(&self.file_path)?;
        let names = dir
            .filter_map(|f| f.ok())
            .filter(|f| f.path().is_file())
            .filter_map(|f| f.file_name().into_string().ok())
            .collect();

        Ok(names)
    }

    pub fn get_file(&self, file_name: &str) -> Result<String> {
        let filepath = self.file_path.join(file_name);

        if filepath.is_file() {
            Ok(fs::read_to_string(filepath)?)
        } else {
            Err(Error::NotFound(format!(
                "Requested file was not found: {file_name}"
            )))
        }
    }
}

/// Write the file to the directory. The contents land in a temporary
/// sibling first and are renamed into place, so readers never see a
/// half-written file.
pub fn write_file(directory: &Path, file_name: &str, data: &str) -> Result<()> {
    if !directory.exists() {
        fs::create_dir_all(directory)?
    }

    let path = directory.join(file_name);
    let tmp_path = directory.join(format!("{file_name}.tmp"));
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, &path)?;
    Ok(())
}

pub fn delete_file(directory: &Path, file_name: &str) -> Result<()> {
    let file_to_delete = directory.join(file_name);
    if file_to_delete.is_file() {
        fs::remove_file(file_to_delete).map_err(Error::Io)
    } else {
        Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Requested file to delete was not found: {file_name}"),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_delete() {
        let tmp = tempfile::TempDir::new().unwrap();
        let directory = Directory::new(tmp.path().join("nested"));
        let file_name = "file_test_name.txt";

        write_file(&directory.file_path, file_name, "test").unwrap();
        assert_eq!(directory.get_file(file_name).unwrap(), "test");

        delete_file(&directory.file_path, file_name).unwrap();
        assert!(directory.get_file(file_name).unwrap_err().is_not_found());
        assert!(delete_file(&directory.file_path, file_name).is_err());
    }

    #[test]
    fn test_get_multiple() {
        let tmp = tempfile::TempDir::new().unwrap();
        let directory = Directory::new(tmp.path().to_path_buf());

        for i in 0..10 {
            write_file(&directory.file_path, &format!("file{i}.txt"), "test").unwrap();
        }

        let files = directory.get_files().unwrap();
        let names = directory.get_file_names().unwrap();
        assert_eq!(files.len(), 10);
        for i in 0..10 {
            let file_name = format!("file{i}.txt");
            assert_eq!(files.get(&file_name).map(String::as_str), Some("test"));
            assert!(names.contains(&file_name));
        }
    }

    #[test]
    fn overwrite_leaves_no_temp_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let directory = Directory::new(tmp.path().to_path_buf());

        write_file(&directory.file_path, "a.json", "1").unwrap();
        write_file(&directory.file_path, "a.json", "2").unwrap();

        assert_eq!(directory.get_file("a.json").unwrap(), "2");
        assert_eq!(directory.get_file_names().unwrap(), vec!["a.json".to_string()]);
    }

    #[test]
    fn data_path_layout() {
        let path = DataPath::new("/tmp/rd");
        assert_eq!(path.path(DataPathType::Setting), PathBuf::from("/tmp/rd/settings"));
        assert_eq!(
            path.path(DataPathType::ModelCache),
            PathBuf::from("/tmp/rd/cache/models")
        );
    }
}
