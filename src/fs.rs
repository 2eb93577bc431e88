//! File access used by the CLI and the config loader.
//!
//! Model files, config files and reports all go through `FileSystem` so that
//! commands can be exercised against an in-memory tree in tests.

use std::io;
use std::path::Path;

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Writes `content`, replacing any existing file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

pub fn default_fs() -> &'static RealFs {
    static INSTANCE: RealFs = RealFs;
    &INSTANCE
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// In-memory file tree keyed by path string. Directories exist implicitly
    /// as prefixes of stored files.
    #[derive(Debug, Default)]
    pub struct MockFs {
        files: RwLock<HashMap<String, String>>,
    }

    impl MockFs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_files<I, P, C>(files: I) -> Self
        where
            I: IntoIterator<Item = (P, C)>,
            P: AsRef<Path>,
            C: Into<String>,
        {
            let map = files
                .into_iter()
                .map(|(p, c)| (key(p.as_ref()), c.into()))
                .collect();
            Self {
                files: RwLock::new(map),
            }
        }

        pub fn get(&self, path: &Path) -> Option<String> {
            self.files.read().unwrap().get(&key(path)).cloned()
        }
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    impl FileSystem for MockFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.get(path).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {}", path.display()),
                )
            })
        }

        fn write(&self, path: &Path, content: &str) -> io::Result<()> {
            self.files
                .write()
                .unwrap()
                .insert(key(path), content.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.read().unwrap().contains_key(&key(path)) || self.is_dir(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            let prefix = format!("{}/", key(path).trim_end_matches('/'));
            self.files
                .read()
                .unwrap()
                .keys()
                .any(|k| k.starts_with(&prefix))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mock_fs_read_write() {
            let fs = MockFs::new();
            let path = Path::new("/shop/model.json");

            assert!(!fs.exists(path));
            assert!(fs.read_to_string(path).is_err());

            fs.write(path, "[]").unwrap();
            assert!(fs.exists(path));
            assert_eq!(fs.read_to_string(path).unwrap(), "[]");
        }

        #[test]
        fn test_directories_are_implicit() {
            let fs = MockFs::with_files([(Path::new("/shop/model.json"), "[]")]);
            assert!(fs.is_dir(Path::new("/shop")));
            assert!(fs.exists(Path::new("/shop")));
            assert!(!fs.is_dir(Path::new("/shop/model.json")));
            assert!(!fs.is_dir(Path::new("/sho")));
        }
    }
}
