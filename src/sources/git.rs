//! Git checkouts of auxiliary sources.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use git2::build::RepoBuilder;
use url::Url;

use crate::util::config::AuxSource;
use crate::util::fs::ensure_dir;

/// A repository cloned next to the project.
#[derive(Debug, Clone)]
pub struct GitSource {
    /// Remote repository URL
    remote: Url,

    /// Branch to check out; the remote's default when unset
    branch: Option<String>,

    /// Local checkout path
    dest: PathBuf,
}

impl GitSource {
    pub fn new(url: &str, branch: Option<String>, dest: impl Into<PathBuf>) -> Result<Self> {
        Ok(GitSource {
            remote: parse_remote(url)?,
            branch,
            dest: dest.into(),
        })
    }

    /// Build from a `[[deps.sources]]` entry; `dest` is relative to
    /// `project_dir`.
    pub fn from_config(source: &AuxSource, project_dir: &Path) -> Result<Self> {
        Self::new(
            &source.url,
            source.branch.clone(),
            project_dir.join(&source.dest),
        )
    }

    pub fn remote(&self) -> &Url {
        &self.remote
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Whether something already occupies the destination.
    pub fn is_present(&self) -> bool {
        self.dest.exists()
    }

    /// Clone into the destination.
    pub fn checkout(&self) -> Result<()> {
        tracing::info!("cloning {} into {}", self.remote, self.dest.display());

        if let Some(parent) = self.dest.parent() {
            ensure_dir(parent)?;
        }

        let mut builder = RepoBuilder::new();
        if let Some(branch) = &self.branch {
            builder.branch(branch);
        }
        builder
            .clone(self.remote.as_str(), &self.dest)
            .with_context(|| format!("failed to clone {}", self.remote))?;

        Ok(())
    }
}

/// Accept URLs and, for local mirrors, plain absolute paths.
fn parse_remote(url: &str) -> Result<Url> {
    match Url::parse(url) {
        Ok(remote) => Ok(remote),
        Err(e) => {
            let path = Path::new(url);
            if path.is_absolute() {
                Url::from_directory_path(path)
                    .map_err(|_| anyhow!("invalid repository path `{}`", url))
            } else {
                Err(e).with_context(|| format!("invalid repository URL `{}`", url))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use git2::{Repository, Signature};
    use tempfile::TempDir;

    /// Create a repository with one commit on its default branch and a
    /// `stable` branch pointing at the same commit.
    pub(crate) fn init_repo(dir: &Path) {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join("dub.sdl"), "name \"dialect\"\n").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("dub.sdl")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("anvil", "anvil@localhost").unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        let commit = repo.find_commit(oid).unwrap();
        repo.branch("stable", &commit, false).unwrap();
    }

    #[test]
    fn test_parse_remote() {
        let url = parse_remote("https://github.com/zorael/dialect.git").unwrap();
        assert_eq!(url.host_str(), Some("github.com"));

        assert!(parse_remote("not a url").is_err());
    }

    #[test]
    fn test_checkout_local_repository() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        std::fs::create_dir(&upstream).unwrap();
        init_repo(&upstream);

        let dest = tmp.path().join("deps").join("dialect");
        let source = GitSource::new(
            upstream.to_str().unwrap(),
            Some("stable".to_string()),
            &dest,
        )
        .unwrap();
        assert!(!source.is_present());

        source.checkout().unwrap();

        assert!(source.is_present());
        assert!(dest.join("dub.sdl").is_file());
        let repo = Repository::open(&dest).unwrap();
        assert_eq!(repo.head().unwrap().shorthand(), Some("stable"));
    }

    #[test]
    fn test_from_config_is_relative_to_project() {
        let source = AuxSource {
            url: "https://github.com/zorael/dialect.git".into(),
            dest: PathBuf::from("../dialect"),
            branch: None,
            enabled: true,
        };
        let git = GitSource::from_config(&source, Path::new("/src/kameloso")).unwrap();
        assert_eq!(git.dest(), Path::new("/src/kameloso/../dialect"));
    }
}
