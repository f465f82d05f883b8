use super::error::{Result, SyncError};
use super::tree::{join_path, normalize_path};

/// 本地根目录与远程根目录之间的路径转换
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    local_root: String,
    remote_root: String,
}

impl PathMapper {
    pub fn new(local_root: &str, remote_root: &str) -> Self {
        Self {
            local_root: normalize_path(local_root),
            remote_root: normalize_path(remote_root),
        }
    }

    pub fn local_root(&self) -> &str {
        &self.local_root
    }

    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    /// 本地路径 -> 远程路径
    pub fn to_remote(&self, local_path: &str) -> Result<String> {
        let relative = strip_root(&self.local_root, local_path)?;
        Ok(join_path(&self.remote_root, relative))
    }

    /// 远程路径 -> 本地路径
    pub fn to_local(&self, remote_path: &str) -> Result<String> {
        let relative = strip_root(&self.remote_root, remote_path)?;
        Ok(join_path(&self.local_root, relative))
    }
}

/// 去掉根目录前缀，只接受根目录的真子路径
fn strip_root<'a>(root: &str, path: &'a str) -> Result<&'a str> {
    let mismatch = || SyncError::Mapping {
        path: path.to_string(),
        root: root.to_string(),
    };

    let rest = path.strip_prefix(root).ok_or_else(mismatch)?;
    let rest = if root.ends_with('/') {
        rest
    } else {
        rest.strip_prefix('/').ok_or_else(mismatch)?
    };

    if rest.is_empty() || rest.starts_with('/') {
        return Err(mismatch());
    }
    Ok(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_between_roots() {
        let mapper = PathMapper::new("/home/u/docs/", "/backup/docs");
        assert_eq!(
            mapper.to_remote("/home/u/docs/dir/b.txt").unwrap(),
            "/backup/docs/dir/b.txt"
        );
        assert_eq!(
            mapper.to_local("/backup/docs/a.txt").unwrap(),
            "/home/u/docs/a.txt"
        );
    }

    #[test]
    fn test_round_trip() {
        let mapper = PathMapper::new("C:\\Users\\u\\docs", "/");
        for p in ["C:/Users/u/docs/a.txt", "C:/Users/u/docs/x/y/z.bin"] {
            let remote = mapper.to_remote(p).unwrap();
            assert!(remote.starts_with('/'));
            assert_eq!(mapper.to_local(&remote).unwrap(), p);
        }
        for r in ["/a.txt", "/x/y"] {
            let local = mapper.to_local(r).unwrap();
            assert_eq!(mapper.to_remote(&local).unwrap(), r);
        }
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let mapper = PathMapper::new("/home/u/docs", "/backup");
        // 前缀相同但不是子目录
        assert!(matches!(
            mapper.to_remote("/home/u/docs2/a.txt"),
            Err(SyncError::Mapping { .. })
        ));
        assert!(mapper.to_remote("/home/u/docs").is_err());
        assert!(mapper.to_remote("/etc/passwd").is_err());
        assert!(mapper.to_local("/other/a.txt").is_err());
        assert!(mapper.to_local("/backup/").is_err());
    }
}
