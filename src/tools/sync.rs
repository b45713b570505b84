//! Hash comparison between a local folder and an S3 prefix

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use glob::Pattern;
use log::{debug, warn};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::commands::CommandError;

/// Relative file name to md5 hex digest
pub type FileHashes = BTreeMap<String, String>;

const BLOCK_SIZE: usize = 1 << 20;

/// Names present in `source` but missing from `target` or hashed differently there,
/// sorted.
#[must_use]
pub fn changed_files(source: &FileHashes, target: &FileHashes) -> Vec<String> {
    source
        .iter()
        .filter(|(name, hash)| target.get(*name) != Some(*hash))
        .map(|(name, _)| name.clone())
        .collect()
}

/// # Errors
///
/// Returns the I/O error if the file cannot be read.
pub fn compute_md5(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0; BLOCK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// md5 of every file below `root`, keyed by path relative to `root`.
///
/// Files matching one of `ignore` and names ending in a carriage return (resource
/// forks such as `Icon\r`) are skipped.
///
/// # Errors
///
/// Returns `CommandError::Io` if a file cannot be read.
pub fn local_hashes(root: &Path, ignore: &[Pattern]) -> Result<FileHashes, CommandError> {
    let mut hashes = FileHashes::new();
    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry below {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        if name.ends_with('\r') || ignore.iter().any(|pattern| pattern.matches(&name)) {
            debug!("Ignoring {name}");
            continue;
        }
        hashes.insert(name, compute_md5(entry.path())?);
    }
    Ok(hashes)
}

/// Strip the bucket prefix from an object key, and any leading slash left over.
#[must_use]
pub fn strip_prefix<'a>(key: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return key;
    }
    key.split_once(prefix)
        .map_or(key, |(_, rest)| rest)
        .trim_start_matches('/')
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectListing {
    #[serde(default)]
    contents: Vec<S3Object>,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "ETag")]
    etag: String,
}

/// Hashes from the JSON output of `aws s3api list-objects-v2`, keyed by object key
/// with `prefix` stripped.
///
/// # Errors
///
/// Returns `CommandError::Aborted` if the output is not a valid object listing.
pub fn remote_hashes(listing: &str, prefix: &str) -> Result<FileHashes, CommandError> {
    if listing.trim().is_empty() {
        return Ok(FileHashes::new());
    }
    let listing: ObjectListing = serde_json::from_str(listing)
        .map_err(|e| CommandError::Aborted(format!("unable to read the S3 object listing: {e}")))?;
    Ok(listing
        .contents
        .into_iter()
        .filter(|object| !object.key.ends_with("Icon\n"))
        .map(|object| {
            let name = strip_prefix(&object.key, prefix).to_string();
            (name, object.etag.trim_matches('"').to_string())
        })
        .filter(|(name, _)| !name.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(entries: &[(&str, &str)]) -> FileHashes {
        entries
            .iter()
            .map(|(name, hash)| ((*name).to_string(), (*hash).to_string()))
            .collect()
    }

    #[test]
    fn test_changed_files() {
        let source = hashes(&[
            ("images/same_hash.jpg", "7f7b682a6da0ffb6f40811ffba10ade3"),
            ("images/diff_hash.jpg", "bdba7bf1340ceddb3e3c3aa3cd7d0ad6"),
            ("images/dne.jpg", "b68a0e1dd8afc98bc883c3cf11b73526"),
        ]);
        let target = hashes(&[
            ("images/same_hash.jpg", "7f7b682a6da0ffb6f40811ffba10ade3"),
            ("images/diff_hash.jpg", "2f2a916dfbe711ab85b98ef2da41969c"),
            ("images/only_target.jpg", "6a410bc526acad08999c398c82882bd4"),
        ]);
        assert_eq!(
            changed_files(&source, &target),
            vec!["images/diff_hash.jpg", "images/dne.jpg"]
        );
        assert_eq!(
            changed_files(&target, &source),
            vec!["images/diff_hash.jpg", "images/only_target.jpg"]
        );
    }

    #[test]
    fn test_local_hashes_skip_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css/.webassets-cache")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "body {}").unwrap();
        std::fs::write(dir.path().join("css/.webassets-cache/abc"), "cached").unwrap();
        std::fs::write(dir.path().join("Icon\r"), "").unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello").unwrap();

        let ignore = vec![Pattern::new("*.webassets-cache*").unwrap()];
        let hashes = local_hashes(dir.path(), &ignore).unwrap();
        assert_eq!(
            hashes.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["css/site.css", "hello.txt"]
        );
        assert_eq!(hashes["hello.txt"], "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("dencold/images/a.jpg", "dencold/"), "images/a.jpg");
        assert_eq!(strip_prefix("dencold/images/a.jpg", "dencold"), "images/a.jpg");
        assert_eq!(strip_prefix("images/a.jpg", ""), "images/a.jpg");
    }

    #[test]
    fn test_remote_hashes() {
        let listing = r#"{
            "Contents": [
                {"Key": "dencold/images/a.jpg", "ETag": "\"7f7b682a6da0ffb6f40811ffba10ade3\"", "Size": 10},
                {"Key": "dencold/", "ETag": "\"d41d8cd98f00b204e9800998ecf8427e\"", "Size": 0}
            ]
        }"#;
        assert_eq!(
            remote_hashes(listing, "dencold/").unwrap(),
            hashes(&[("images/a.jpg", "7f7b682a6da0ffb6f40811ffba10ade3")])
        );
        assert!(remote_hashes("", "dencold/").unwrap().is_empty());
        assert!(remote_hashes("{}", "").unwrap().is_empty());
    }
}
