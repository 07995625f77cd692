//! Turning discovered files into page text.
//!
//! Responsibilities:
//! - Read plain page files.
//! - Decrypt encrypted page files (see `crypt.rs` for the container).
//! - Run executable page files and capture their standard output.
//!
//! Does NOT handle:
//! - Classifying files into families (see `pattern.rs`).
//! - Parsing the resulting text (see `page.rs`).
//!
//! Invariants:
//! - Every failure is typed per file; the registry decides whether to skip
//!   or surface it (during discovery it always skips).
//! - Executable pages run to completion; there is no timeout concept.

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

use crate::crypt::{CipherError, MasterKeySource, PageCipher};
use crate::discovery::DiscoveredFile;
use crate::pattern::PatternFamily;

/// Errors that can occur while loading one page file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read page file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decrypt page file {path}")]
    Decrypt {
        path: PathBuf,
        #[source]
        source: CipherError,
    },

    #[error("page file {path} is not valid UTF-8")]
    Utf8 { path: PathBuf },

    #[error("failed to run executable page {path}")]
    Exec {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("executable page {path} exited with {status}")]
    ExecStatus {
        path: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// Loads page text from a discovered file according to its family.
#[derive(Debug)]
pub struct PageLoader {
    cipher: PageCipher,
}

impl PageLoader {
    pub fn new(key_source: MasterKeySource) -> Self {
        Self {
            cipher: PageCipher::new(key_source),
        }
    }

    /// Produce the page text for one discovered file.
    pub fn load(&self, file: &DiscoveredFile) -> Result<String, LoadError> {
        match file.family {
            PatternFamily::Plain => self.load_plain(&file.path),
            PatternFamily::Encrypted => self.load_encrypted(&file.path),
            PatternFamily::Executable => self.load_executable(&file.path),
        }
    }

    fn load_plain(&self, path: &std::path::Path) -> Result<String, LoadError> {
        std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load_encrypted(&self, path: &std::path::Path) -> Result<String, LoadError> {
        let container = std::fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let plaintext = self
            .cipher
            .decrypt_page(&container)
            .map_err(|source| LoadError::Decrypt {
                path: path.to_path_buf(),
                source,
            })?;
        String::from_utf8(plaintext).map_err(|_| LoadError::Utf8 {
            path: path.to_path_buf(),
        })
    }

    fn load_executable(&self, path: &std::path::Path) -> Result<String, LoadError> {
        let output = Command::new(path)
            .output()
            .map_err(|source| LoadError::Exec {
                path: path.to_path_buf(),
                source,
            })?;
        if !output.status.success() {
            return Err(LoadError::ExecStatus {
                path: path.to_path_buf(),
                status: output.status,
            });
        }
        String::from_utf8(output.stdout).map_err(|_| LoadError::Utf8 {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn password_loader(password: &str) -> PageLoader {
        PageLoader::new(MasterKeySource::Password(SecretString::new(
            password.to_string().into(),
        )))
    }

    #[test]
    fn test_load_plain() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.prc");
        std::fs::write(&path, "win-size 800 600\n").unwrap();

        let text = password_loader("pw")
            .load(&DiscoveredFile {
                path,
                family: PatternFamily::Plain,
            })
            .unwrap();
        assert_eq!(text, "win-size 800 600\n");
    }

    #[test]
    fn test_load_plain_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let result = password_loader("pw").load(&DiscoveredFile {
            path: tmp.path().join("missing.prc"),
            family: PatternFamily::Plain,
        });
        assert!(matches!(result, Err(LoadError::Read { .. })));
    }

    #[test]
    fn test_load_encrypted_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.pre");
        let loader = password_loader("pw");
        let container = loader.cipher.encrypt_page(b"secret-key 42\n").unwrap();
        std::fs::write(&path, container).unwrap();

        let text = loader
            .load(&DiscoveredFile {
                path,
                family: PatternFamily::Encrypted,
            })
            .unwrap();
        assert_eq!(text, "secret-key 42\n");
    }

    #[test]
    fn test_load_encrypted_garbage_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.pre");
        std::fs::write(&path, b"not a container").unwrap();

        let result = password_loader("pw").load(&DiscoveredFile {
            path,
            family: PatternFamily::Encrypted,
        });
        assert!(matches!(result, Err(LoadError::Decrypt { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_executable_captures_stdout() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gen-page");
        std::fs::write(&path, "#!/bin/sh\necho 'generated-key 1'\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let text = password_loader("pw")
            .load(&DiscoveredFile {
                path,
                family: PatternFamily::Executable,
            })
            .unwrap();
        assert_eq!(text, "generated-key 1\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_load_executable_nonzero_exit_fails() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gen-page");
        std::fs::write(&path, "#!/bin/sh\nexit 3\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let result = password_loader("pw").load(&DiscoveredFile {
            path,
            family: PatternFamily::Executable,
        });
        assert!(matches!(result, Err(LoadError::ExecStatus { .. })));
    }
}
