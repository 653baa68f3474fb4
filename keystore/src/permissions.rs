//! Best effort check that a key file is readable by its owner only.

use std::path::Path;

/// Outcome of the owner-only check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePermissions {
    /// No group or other permission bits are set
    Private,
    /// Group or other bits are set; carries the permission bits
    Exposed(u32),
    /// The platform or filesystem cannot tell
    Unknown,
}

#[cfg(unix)]
pub fn check(path: &Path) -> FilePermissions {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => {
            let mode = meta.permissions().mode() & 0o777;
            if mode & 0o077 == 0 {
                FilePermissions::Private
            } else {
                FilePermissions::Exposed(mode)
            }
        }
        Err(_) => FilePermissions::Unknown,
    }
}

#[cfg(not(unix))]
pub fn check(_path: &Path) -> FilePermissions {
    FilePermissions::Unknown
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;

    #[rstest(
        mode,
        expected,
        case(0o600, FilePermissions::Private),
        case(0o400, FilePermissions::Private),
        case(0o640, FilePermissions::Exposed(0o640)),
        case(0o644, FilePermissions::Exposed(0o644))
    )]
    fn test_check(mode: u32, expected: FilePermissions) {
        let file = NamedTempFile::new().unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(mode)).unwrap();
        assert_eq!(expected, check(file.path()));
    }

    #[test]
    fn test_check_missing_file() {
        assert_eq!(
            FilePermissions::Unknown,
            check(Path::new("/nonexistent/pemstore/key.pem"))
        );
    }
}
