//! Kaggle dataset acquisition
//!
//! Fetches a dataset archive from the Kaggle REST API using the credentials
//! in `kaggle.json` and extracts it next to the archive.

use std::env;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use serde::Deserialize;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::utils::error::{FaceMaskError, Result, ResultExt};

/// Base URL of the Kaggle dataset download endpoint
pub const KAGGLE_DOWNLOAD_URL: &str = "https://www.kaggle.com/api/v1/datasets/download";

/// Environment variable that overrides the directory holding `kaggle.json`
pub const KAGGLE_CONFIG_DIR_ENV: &str = "KAGGLE_CONFIG_DIR";

/// Kaggle API credentials
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

// Keep the API key out of logs
impl std::fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"***")
            .finish()
    }
}

impl KaggleCredentials {
    /// Read credentials from a `kaggle.json` file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(FaceMaskError::Credentials(format!(
                "no kaggle.json at {:?}; create one from your Kaggle account settings",
                path
            )));
        }

        let contents = fs::read_to_string(path)?;
        let credentials: Self = serde_json::from_str(&contents).map_err(|e| {
            FaceMaskError::Credentials(format!("malformed {:?}: {}", path, e))
        })?;

        if credentials.username.is_empty() || credentials.key.is_empty() {
            return Err(FaceMaskError::Credentials(format!(
                "empty username or key in {:?}",
                path
            )));
        }

        debug!("Loaded Kaggle credentials for '{}'", credentials.username);
        Ok(credentials)
    }

    /// `$KAGGLE_CONFIG_DIR/kaggle.json`, falling back to `~/.kaggle/kaggle.json`
    pub fn default_path() -> Result<PathBuf> {
        if let Some(dir) = env::var_os(KAGGLE_CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir).join("kaggle.json"));
        }

        let home = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .context("cannot locate kaggle.json: HOME is not set")?;

        Ok(PathBuf::from(home).join(".kaggle").join("kaggle.json"))
    }

    /// Load from the default location
    pub fn from_default_location() -> Result<Self> {
        Self::load(&Self::default_path()?)
    }
}

/// An `owner/name` Kaggle dataset reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for DatasetRef {
    type Err = FaceMaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(FaceMaskError::InvalidInput(format!(
                "dataset reference must look like 'owner/name', got '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl DatasetRef {
    /// Download URL on the Kaggle API
    pub fn url(&self) -> String {
        format!("{}/{}/{}", KAGGLE_DOWNLOAD_URL, self.owner, self.name)
    }

    /// File name the archive is saved under
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.name)
    }
}

/// Download the archive of `dataset` into `out_dir`
///
/// Returns the archive path. No request is made when the archive is already
/// present.
pub fn download_dataset(
    dataset: &DatasetRef,
    credentials: &KaggleCredentials,
    out_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let archive_path = out_dir.join(dataset.archive_name());

    if archive_path.exists() {
        info!("Archive {:?} already exists, skipping download", archive_path);
        return Ok(archive_path);
    }

    let url = dataset.url();
    info!("Downloading {} from {}", dataset, url);

    // The archive runs to hundreds of megabytes; the transfer may take as
    // long as it needs
    let client = client_builder(None).build()?;
    let bytes = download_to(&client, &url, credentials, &archive_path)?;

    info!("Downloaded {} bytes to {:?}", bytes, archive_path);
    Ok(archive_path)
}

/// HTTP client settings for archive downloads
fn client_builder(timeout: Option<Duration>) -> ClientBuilder {
    Client::builder().timeout(timeout)
}

/// Stream `url` into `archive_path` through a `.part` sibling
///
/// The sibling is renamed only once the body is complete and removed when
/// the transfer fails, so an interrupted download never looks like an
/// archive.
fn download_to(
    client: &Client,
    url: &str,
    credentials: &KaggleCredentials,
    archive_path: &Path,
) -> Result<u64> {
    let mut response = client
        .get(url)
        .basic_auth(&credentials.username, Some(&credentials.key))
        .send()?
        .error_for_status()?;

    let partial_path = archive_path.with_extension("zip.part");
    let copied = File::create(&partial_path)
        .and_then(|mut file| io::copy(&mut response, &mut file));

    match copied {
        Ok(bytes) => {
            fs::rename(&partial_path, archive_path)?;
            Ok(bytes)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial_path) {
                debug!("Could not remove {:?}: {}", partial_path, cleanup);
            }
            Err(e.into())
        }
    }
}

/// Extract every entry of a zip archive into `dest`
///
/// Entries whose path would land outside `dest` are rejected. Returns the
/// number of files written.
pub fn extract_archive(zip_path: &Path, dest: &Path) -> Result<usize> {
    if !zip_path.is_file() {
        return Err(FaceMaskError::PathNotFound(zip_path.to_path_buf()));
    }

    info!("Extracting {:?} into {:?}", zip_path, dest);
    fs::create_dir_all(dest)?;

    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    let mut written = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry.enclosed_name().ok_or_else(|| {
            FaceMaskError::Archive(format!("entry '{}' escapes the destination", entry.name()))
        })?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    info!("Extracted {} files", written);
    Ok(written)
}

/// Download (if needed) and extract a dataset, returning the extraction root
pub fn fetch_dataset(
    dataset: &DatasetRef,
    credentials: &KaggleCredentials,
    out_dir: &Path,
) -> Result<PathBuf> {
    let archive = download_dataset(dataset, credentials, out_dir)?;
    extract_archive(&archive, out_dir)?;
    Ok(out_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    /// Serve one response whose body stalls for `stall` halfway through;
    /// the handle yields the raw request head
    fn serve_stalling(
        body: &'static [u8],
        stall: Duration,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/archive", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let (first, rest) = body.split_at(body.len() / 2);
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(first);
            let _ = stream.flush();
            thread::sleep(stall);
            // The client may have hung up already
            let _ = stream.write_all(rest);
            let _ = stream.flush();

            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn test_credentials() -> KaggleCredentials {
        KaggleCredentials {
            username: "user".to_string(),
            key: "secret".to_string(),
        }
    }

    #[test]
    fn test_download_waits_for_slow_body() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("slow.zip");
        let (url, server) = serve_stalling(b"0123456789abcdef", Duration::from_millis(400));

        let client = client_builder(None).no_proxy().build().unwrap();
        let bytes = download_to(&client, &url, &test_credentials(), &archive).unwrap();

        assert_eq!(bytes, 16);
        assert_eq!(fs::read(&archive).unwrap(), b"0123456789abcdef");
        assert!(!archive.with_extension("zip.part").exists());

        let request = server.join().unwrap();
        // base64("user:secret")
        let auth = request
            .lines()
            .find(|line| line.to_ascii_lowercase().starts_with("authorization:"))
            .expect("no authorization header");
        assert_eq!(auth.split_once(':').unwrap().1.trim(), "Basic dXNlcjpzZWNyZXQ=");
    }

    #[test]
    fn test_failed_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("cut.zip");
        let (url, server) = serve_stalling(b"0123456789abcdef", Duration::from_millis(600));

        let client = client_builder(Some(Duration::from_millis(150)))
            .no_proxy()
            .build()
            .unwrap();
        let result = download_to(&client, &url, &test_credentials(), &archive);
        server.join().unwrap();

        assert!(result.is_err());
        assert!(!archive.exists());
        assert!(!archive.with_extension("zip.part").exists());
    }

    #[test]
    fn test_load_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kaggle.json");
        fs::write(&path, r#"{"username": "alice", "key": "abc123"}"#).unwrap();

        let credentials = KaggleCredentials::load(&path).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.key, "abc123");
        assert!(!format!("{:?}", credentials).contains("abc123"));
    }

    #[test]
    fn test_load_credentials_missing_or_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kaggle.json");
        assert!(matches!(
            KaggleCredentials::load(&path),
            Err(FaceMaskError::Credentials(_))
        ));

        fs::write(&path, "{\"username\": \"alice\"}").unwrap();
        assert!(matches!(
            KaggleCredentials::load(&path),
            Err(FaceMaskError::Credentials(_))
        ));

        fs::write(&path, r#"{"username": "", "key": "k"}"#).unwrap();
        assert!(KaggleCredentials::load(&path).is_err());
    }

    #[test]
    fn test_dataset_ref_parse() {
        let dataset: DatasetRef = crate::DATASET_REF.parse().unwrap();
        assert_eq!(dataset.owner, "omkargurav");
        assert_eq!(dataset.name, "face-mask-dataset");
        assert_eq!(dataset.archive_name(), "face-mask-dataset.zip");
        assert_eq!(
            dataset.url(),
            "https://www.kaggle.com/api/v1/datasets/download/omkargurav/face-mask-dataset"
        );
        assert_eq!(dataset.to_string(), crate::DATASET_REF);

        assert!("no-slash".parse::<DatasetRef>().is_err());
        assert!("/name".parse::<DatasetRef>().is_err());
        assert!("a/b/c".parse::<DatasetRef>().is_err());
    }

    #[test]
    fn test_download_skips_existing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let dataset: DatasetRef = "someone/local-only".parse().unwrap();
        let existing = dir.path().join(dataset.archive_name());
        fs::write(&existing, b"cached").unwrap();

        let credentials = KaggleCredentials {
            username: "u".to_string(),
            key: "k".to_string(),
        };
        let path = download_dataset(&dataset, &credentials, dir.path()).unwrap();
        assert_eq!(path, existing);
        assert_eq!(fs::read(&path).unwrap(), b"cached");
    }

    #[test]
    fn test_extract_archive_layout() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("face-mask-dataset.zip");
        write_zip(
            &zip_path,
            &[
                ("data/with_mask/with_mask_1.jpg", b"a"),
                ("data/without_mask/without_mask_1.jpg", b"bb"),
            ],
        );

        let dest = dir.path().join("out");
        let written = extract_archive(&zip_path, &dest).unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            fs::read(dest.join("data/without_mask/without_mask_1.jpg")).unwrap(),
            b"bb"
        );
    }

    #[test]
    fn test_extract_rejects_escaping_entry() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("evil.zip");
        write_zip(&zip_path, &[("../outside.txt", b"x")]);

        let dest = dir.path().join("out");
        assert!(matches!(
            extract_archive(&zip_path, &dest),
            Err(FaceMaskError::Archive(_))
        ));
        assert!(!dir.path().join("outside.txt").exists());
    }

    #[test]
    fn test_extract_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            extract_archive(&dir.path().join("nope.zip"), dir.path()),
            Err(FaceMaskError::PathNotFound(_))
        ));
    }
}
