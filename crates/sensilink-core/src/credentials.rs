// ── Credential resolution ──
//
// The account password may be stored encrypted. It is decrypted at most
// once per process and the plaintext is kept for the life of the cache.
// A failed decryption is not remembered; the next caller tries again.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use sensilink_api::Credentials;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("failed to run decryptor `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decryptor `{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("decrypted secret is not valid UTF-8")]
    Encoding,

    #[error("decrypted secret is empty")]
    Empty,

    #[error("{0}")]
    Other(String),
}

/// Turns an encrypted blob into the plaintext secret.
#[async_trait]
pub trait Decryptor: Send + Sync + fmt::Debug {
    async fn decrypt(&self, blob: &str) -> Result<SecretString, DecryptError>;
}

/// Decrypts by piping the blob to an external command and reading stdout.
///
/// Works with anything that speaks stdin/stdout: `age -d -i key`,
/// `gpg --decrypt`, `sops -d /dev/stdin`, a cloud KMS CLI wrapper.
#[derive(Debug, Clone)]
pub struct CommandDecryptor {
    program: String,
    args: Vec<String>,
}

impl CommandDecryptor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full argv (`["age", "-d", "-i", "key.txt"]`).
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl Decryptor for CommandDecryptor {
    async fn decrypt(&self, blob: &str) -> Result<SecretString, DecryptError> {
        let spawn_err = |source| DecryptError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A decryptor that exits without reading closes the pipe early;
            // its exit status is the error worth reporting.
            match stdin.write_all(blob.as_bytes()).await {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(spawn_err(e)),
                _ => {}
            }
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        if !output.status.success() {
            return Err(DecryptError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let plaintext = String::from_utf8(output.stdout).map_err(|_| DecryptError::Encoding)?;
        let plaintext = plaintext.trim_end_matches(['\r', '\n']);
        if plaintext.is_empty() {
            return Err(DecryptError::Empty);
        }
        Ok(SecretString::from(plaintext.to_owned()))
    }
}

/// Where the account password comes from.
#[derive(Clone)]
pub enum PasswordSource {
    Plain(SecretString),
    Encrypted {
        blob: String,
        decryptor: Arc<dyn Decryptor>,
    },
}

impl fmt::Debug for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain(<redacted>)"),
            Self::Encrypted { decryptor, .. } => f
                .debug_struct("Encrypted")
                .field("blob", &"<redacted>")
                .field("decryptor", decryptor)
                .finish(),
        }
    }
}

/// Lazily resolved account credentials, shared across invocations.
#[derive(Debug)]
pub struct CredentialCache {
    username: String,
    source: PasswordSource,
    resolved: OnceCell<Credentials>,
}

impl CredentialCache {
    pub fn new(username: impl Into<String>, source: PasswordSource) -> Self {
        Self {
            username: username.into(),
            source,
            resolved: OnceCell::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }

    /// Credentials with a plaintext password, decrypting on first use.
    pub async fn get(&self) -> Result<&Credentials, DecryptError> {
        self.resolved
            .get_or_try_init(|| async {
                let password = match &self.source {
                    PasswordSource::Plain(secret) => secret.clone(),
                    PasswordSource::Encrypted { blob, decryptor } => {
                        debug!(decryptor = ?decryptor, "decrypting account password");
                        decryptor.decrypt(blob).await?
                    }
                };
                Ok::<_, DecryptError>(Credentials::new(self.username.clone(), password))
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::ExposeSecret;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingDecryptor {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl Decryptor for CountingDecryptor {
        async fn decrypt(&self, blob: &str) -> Result<SecretString, DecryptError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(DecryptError::Other("kms unavailable".into()));
            }
            Ok(SecretString::from(blob.chars().rev().collect::<String>()))
        }
    }

    #[tokio::test]
    async fn decrypts_once_and_caches() {
        let decryptor = Arc::new(CountingDecryptor::default());
        let cache = CredentialCache::new(
            "user@example.com",
            PasswordSource::Encrypted {
                blob: "terces".into(),
                decryptor: decryptor.clone(),
            },
        );

        assert!(!cache.is_resolved());
        let first = cache.get().await.unwrap();
        assert_eq!(first.password.expose_secret(), "secret");
        cache.get().await.unwrap();

        assert!(cache.is_resolved());
        assert_eq!(decryptor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_decryption_is_retried() {
        let decryptor = Arc::new(CountingDecryptor {
            fail_first: true,
            ..Default::default()
        });
        let cache = CredentialCache::new(
            "user@example.com",
            PasswordSource::Encrypted {
                blob: "terces".into(),
                decryptor: decryptor.clone(),
            },
        );

        assert!(cache.get().await.is_err());
        assert!(!cache.is_resolved());
        assert!(cache.get().await.is_ok());
        assert_eq!(decryptor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn plain_password_needs_no_decryptor() {
        let cache = CredentialCache::new("u", PasswordSource::Plain(SecretString::from("pw")));
        let creds = cache.get().await.unwrap();
        assert_eq!(creds.username, "u");
        assert_eq!(creds.password.expose_secret(), "pw");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_decryptor_pipes_through_stdin() {
        let decryptor = CommandDecryptor::new("cat", Vec::new());
        let secret = decryptor.decrypt("hunter2\n").await.unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_decryptor_reports_nonzero_exit() {
        let decryptor = CommandDecryptor::new("false", Vec::new());
        let err = decryptor.decrypt("blob").await.unwrap_err();
        assert!(matches!(err, DecryptError::Failed { .. }));
    }

    #[test]
    fn from_argv_splits_program_and_args() {
        let argv = vec!["age".to_owned(), "-d".to_owned()];
        let d = CommandDecryptor::from_argv(&argv).unwrap();
        assert_eq!(d.program, "age");
        assert_eq!(d.args, vec!["-d".to_owned()]);
        assert!(CommandDecryptor::from_argv(&[]).is_none());
    }
}
