//! Amazon S3 sync through the `aws` command line
//!
//! Credentials come from `aws.AWS_ACCESS_KEY_ID` and `aws.AWS_SECRET_ACCESS_KEY` and are
//! passed to each `aws` call through its environment. Changes are found by comparing
//! local md5 digests with the ETags S3 reports.

use std::path::PathBuf;

use glob::Pattern;

use crate::commands::{CommandError, Commander, Context, GroupSpec, at_most, optional};
use crate::settings::Settings;
use crate::shell::{Local, quote};
use crate::tools::sync::{self, FileHashes};

const DEFAULT_IGNORE: &str = "*.webassets-cache*";

const SYNC_S3: &str = "Pushes files from a given source folder to an AWS S3 bucket.

Compares md5 hashes of the local files with the objects in the bucket and uploads
only the files that are new or changed, readable by everyone.

The source folder defaults to SOURCE_FOLDER and the prefix (the root folder within
the bucket) to AWS_FOLDER_PREFIX.

Usage:
    blt e:[env] aws.sync_s3 [source_folder] [prefix]

Examples:
    blt e:s aws.sync_s3 - uses the configured settings
    blt e:s aws.sync_s3 /Users/coldwd/my_dir - uses a runtime source_folder
    blt e:s aws.sync_s3 /Users/coldwd/my_dir dencold/ - uses a runtime source_folder and prefix";

const PULL_S3: &str = "Pulls files from an AWS S3 bucket to a given source folder.

The same comparison as aws.sync_s3, in reverse.

Usage:
    blt e:[env] aws.pull_s3 [source_folder] [prefix]

Examples:
    blt e:s aws.pull_s3 - uses the configured settings
    blt e:s aws.pull_s3 /Users/coldwd/my_dir dencold/ - uses a runtime source_folder and prefix";

const LIST_S3: &str = "Lists all files in the S3 bucket.

Usage:
    blt e:[env] aws.list_s3 [prefix]

Examples:
    blt e:s aws.list_s3 - uses the configured prefix
    blt e:s aws.list_s3 dencold/ - uses a runtime prefix";

const LIST_CHANGES: &str = "Lists changed files between the source folder and S3 bucket.

Usage:
    blt e:[env] aws.list_changes [source_folder] [prefix]

Examples:
    blt e:s aws.list_changes - uses the configured settings
    blt e:s aws.list_changes /Users/coldwd/my_dir dencold/ - uses a runtime source_folder and prefix";

pub const OPERATIONS: &[(&str, &str)] = &[
    ("list_changes", LIST_CHANGES),
    ("list_s3", LIST_S3),
    ("pull_s3", PULL_S3),
    ("sync_s3", SYNC_S3),
];

#[must_use]
pub fn group() -> GroupSpec {
    GroupSpec::from_table("AmazonCommands", OPERATIONS, |cfg, ctx| {
        Box::new(AmazonCommands { cfg, ctx })
    })
}

/// Resolved bucket, local folder and prefix for one call
#[derive(Debug)]
struct Target {
    bucket: String,
    source_folder: PathBuf,
    prefix: String,
}

impl Target {
    fn object_url(&self, name: &str) -> String {
        format!("s3://{}/{}{name}", self.bucket, self.prefix)
    }
}

pub struct AmazonCommands {
    cfg: Settings,
    ctx: Context,
}

impl AmazonCommands {
    fn aws(&self) -> Result<Local<'_>, CommandError> {
        Ok(self
            .ctx
            .local()
            .env("AWS_ACCESS_KEY_ID", self.cfg.str("aws.AWS_ACCESS_KEY_ID")?)
            .env(
                "AWS_SECRET_ACCESS_KEY",
                self.cfg.str("aws.AWS_SECRET_ACCESS_KEY")?,
            ))
    }

    /// The runtime prefix, else `AWS_FOLDER_PREFIX`, always ending in a slash unless empty.
    fn prefix(&self, prefix: Option<&str>) -> Result<String, CommandError> {
        let mut prefix = match prefix {
            Some(prefix) => prefix.to_string(),
            None if self.cfg.contains("aws.AWS_FOLDER_PREFIX") => {
                self.cfg.str("aws.AWS_FOLDER_PREFIX")?.to_string()
            }
            None => String::new(),
        };
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Ok(prefix)
    }

    fn target(&self, source_folder: Option<&str>, prefix: Option<&str>) -> Result<Target, CommandError> {
        let source_folder = match source_folder {
            Some(folder) => PathBuf::from(folder),
            None => PathBuf::from(self.cfg.str("aws.SOURCE_FOLDER")?),
        };
        Ok(Target {
            bucket: self.cfg.str("aws.AWS_BUCKET_NAME")?.to_string(),
            source_folder,
            prefix: self.prefix(prefix)?,
        })
    }

    fn ignore_patterns(&self) -> Result<Vec<Pattern>, CommandError> {
        let patterns = if self.cfg.contains("aws.IGNORE") {
            self.cfg.list("aws.IGNORE")?
        } else {
            vec![DEFAULT_IGNORE.to_string()]
        };
        patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| CommandError::InvalidSetting {
                    key: "aws.IGNORE".to_string(),
                    expected: "a list of glob patterns",
                })
            })
            .collect()
    }

    fn local_hashes(&self, target: &Target) -> Result<FileHashes, CommandError> {
        sync::local_hashes(&target.source_folder, &self.ignore_patterns()?)
    }

    fn remote_hashes(&self, target: &Target) -> Result<FileHashes, CommandError> {
        let listing = self.aws()?.capture(format!(
            "aws s3api list-objects-v2 --bucket {} --prefix {} --output json",
            target.bucket,
            quote(&target.prefix)
        ))?;
        sync::remote_hashes(&listing, &target.prefix)
    }

    fn sync_s3(&self, source_folder: Option<&str>, prefix: Option<&str>) -> Result<(), CommandError> {
        let target = self.target(source_folder, prefix)?;
        let changed = sync::changed_files(&self.local_hashes(&target)?, &self.remote_hashes(&target)?);

        let aws = self.aws()?;
        for name in &changed {
            let local = target.source_folder.join(name);
            aws.run(format!(
                "aws s3 cp {} {} --acl public-read",
                quote(&local.to_string_lossy()),
                quote(&target.object_url(name))
            ))?;
            println!("- {name}");
        }
        println!("{} files uploaded to bucket {}", changed.len(), target.bucket);
        Ok(())
    }

    fn pull_s3(&self, source_folder: Option<&str>, prefix: Option<&str>) -> Result<(), CommandError> {
        let target = self.target(source_folder, prefix)?;
        let changed = sync::changed_files(&self.remote_hashes(&target)?, &self.local_hashes(&target)?);

        let aws = self.aws()?;
        for name in &changed {
            let local = target.source_folder.join(name);
            if let Some(dir) = local.parent()
                && !dir.is_dir()
            {
                std::fs::create_dir_all(dir)?;
            }
            aws.run(format!(
                "aws s3 cp {} {}",
                quote(&target.object_url(name)),
                quote(&local.to_string_lossy())
            ))?;
            println!("downloaded: {name}");
        }
        Ok(())
    }

    fn list_s3(&self, prefix: Option<&str>) -> Result<(), CommandError> {
        let bucket = self.cfg.str("aws.AWS_BUCKET_NAME")?;
        let prefix = self.prefix(prefix)?;
        self.aws()?.run(format!(
            "aws s3 ls {} --recursive",
            quote(&format!("s3://{bucket}/{prefix}"))
        ))
    }

    fn list_changes(&self, source_folder: Option<&str>, prefix: Option<&str>) -> Result<(), CommandError> {
        let target = self.target(source_folder, prefix)?;
        for name in sync::changed_files(&self.local_hashes(&target)?, &self.remote_hashes(&target)?) {
            println!("- {name}");
        }
        Ok(())
    }
}

impl Commander for AmazonCommands {
    fn execute(&mut self, operation: &str, args: &[String]) -> Result<(), CommandError> {
        match operation {
            "sync_s3" => at_most(operation, args, 2)
                .and_then(|()| self.sync_s3(optional(args, 0), optional(args, 1))),
            "pull_s3" => at_most(operation, args, 2)
                .and_then(|()| self.pull_s3(optional(args, 0), optional(args, 1))),
            "list_s3" => at_most(operation, args, 1).and_then(|()| self.list_s3(optional(args, 0))),
            "list_changes" => at_most(operation, args, 2)
                .and_then(|()| self.list_changes(optional(args, 0), optional(args, 1))),
            other => Err(CommandError::UnknownOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;
    use crate::prompt::Scripted;
    use crate::shell::{Shell, ShellCommand};

    /// Answers `list-objects-v2` with a fixed listing and records everything else.
    #[derive(Default)]
    struct FakeAws {
        listing: String,
        calls: Mutex<Vec<ShellCommand>>,
    }

    impl Shell for FakeAws {
        fn run(&self, command: &ShellCommand) -> Result<String, CommandError> {
            self.calls.lock().push(command.clone());
            if command.line.starts_with("aws s3api list-objects-v2") {
                return Ok(self.listing.clone());
            }
            Ok(String::new())
        }
    }

    fn settings(source: &Path) -> Settings {
        let Value::Object(map) = json!({
            "aws": {
                "AWS_ACCESS_KEY_ID": "JLKSNLBNLSKDFJWOEI",
                "AWS_SECRET_ACCESS_KEY": "JFvnwoaifeIOJFnegoiwfaqEF",
                "AWS_BUCKET_NAME": "matter-developers",
                "SOURCE_FOLDER": source.display().to_string(),
                "AWS_FOLDER_PREFIX": "dencold/"
            }
        }) else {
            unreachable!()
        };
        Settings::from(map)
    }

    fn run(source: &Path, listing: &str, operation: &str, args: &[&str]) -> Vec<ShellCommand> {
        let shell = Arc::new(FakeAws {
            listing: listing.to_string(),
            ..FakeAws::default()
        });
        let ctx = Context::new(shell.clone(), Arc::new(Scripted::default()));
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        group()
            .instantiate(settings(source), ctx)
            .execute(operation, &args)
            .unwrap();
        shell.calls.lock().clone()
    }

    fn source_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/same_hash.jpg"), "hello").unwrap();
        std::fs::write(dir.path().join("images/diff_hash.jpg"), "changed").unwrap();
        std::fs::write(dir.path().join("images/dne.jpg"), "new").unwrap();
        dir
    }

    const LISTING: &str = r#"{"Contents": [
        {"Key": "dencold/images/same_hash.jpg", "ETag": "\"5d41402abc4b2a76b9719d911017c592\""},
        {"Key": "dencold/images/diff_hash.jpg", "ETag": "\"2f2a916dfbe711ab85b98ef2da41969c\""},
        {"Key": "dencold/images/only_target.jpg", "ETag": "\"6a410bc526acad08999c398c82882bd4\""}
    ]}"#;

    #[test]
    fn test_sync_s3_uploads_changed_files() {
        let dir = source_folder();
        let calls = run(dir.path(), LISTING, "sync_s3", &[]);

        assert_eq!(
            calls[0].line,
            "aws s3api list-objects-v2 --bucket matter-developers --prefix 'dencold/' --output json"
        );
        assert_eq!(
            calls[0].env.get("AWS_ACCESS_KEY_ID").map(String::as_str),
            Some("JLKSNLBNLSKDFJWOEI")
        );
        let uploads: Vec<String> = calls[1..].iter().map(|c| c.line.clone()).collect();
        let folder = dir.path().display();
        assert_eq!(
            uploads,
            vec![
                format!("aws s3 cp '{folder}/images/diff_hash.jpg' 's3://matter-developers/dencold/images/diff_hash.jpg' --acl public-read"),
                format!("aws s3 cp '{folder}/images/dne.jpg' 's3://matter-developers/dencold/images/dne.jpg' --acl public-read"),
            ]
        );
    }

    #[test]
    fn test_pull_s3_downloads_into_new_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let listing = r#"{"Contents": [{"Key": "assets/css/site.css", "ETag": "\"abc\""}]}"#;
        let calls = run(dir.path(), listing, "pull_s3", &["", "assets"]);

        assert!(dir.path().join("css").is_dir());
        assert_eq!(
            calls[1].line,
            format!(
                "aws s3 cp 's3://matter-developers/assets/css/site.css' '{}/css/site.css'",
                dir.path().display()
            )
        );
    }

    #[test]
    fn test_list_s3() {
        let dir = tempfile::tempdir().unwrap();
        let calls = run(dir.path(), "", "list_s3", &[]);
        assert_eq!(
            calls[0].line,
            "aws s3 ls 's3://matter-developers/dencold/' --recursive"
        );
        let calls = run(dir.path(), "", "list_s3", &["other"]);
        assert_eq!(
            calls[0].line,
            "aws s3 ls 's3://matter-developers/other/' --recursive"
        );
    }

    #[test]
    fn test_list_changes_only_reads() {
        let dir = source_folder();
        let calls = run(dir.path(), LISTING, "list_changes", &[]);
        assert_eq!(calls.len(), 1);
    }
}
