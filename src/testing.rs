//! In-memory collaborators for orchestrator tests

use crate::acquire::ToolCache;
use crate::cache::CacheStore;
use crate::error::{TlsetupError, TlsetupResult};
use crate::exec::{ExecOptions, ExecOutput, ProcessRunner};
use crate::http::HttpClient;
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Scripted HTTP responses keyed by exact URL
#[derive(Default)]
pub struct FakeHttp {
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    redirects: HashMap<String, String>,
    requests: Mutex<usize>,
}

impl FakeHttp {
    pub fn with_text(mut self, url: &str, body: &str) -> Self {
        self.texts.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_file(mut self, url: &str, content: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), content);
        self
    }

    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Number of calls made so far
    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }

    fn count(&self) {
        *self.requests.lock().unwrap() += 1;
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get_text(&self, url: &str) -> TlsetupResult<String> {
        self.count();
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| TlsetupError::http(url, "404 Not Found"))
    }

    async fn download(&self, url: &str, dest: &Path) -> TlsetupResult<u64> {
        self.count();
        let content = self
            .files
            .get(url)
            .ok_or_else(|| TlsetupError::http(url, "404 Not Found"))?;
        std::fs::write(dest, content).map_err(|e| TlsetupError::io("fake download", e))?;
        Ok(content.len() as u64)
    }

    async fn resolve(&self, url: &str) -> TlsetupResult<String> {
        self.count();
        Ok(self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string()))
    }
}

/// A gzipped tarball shaped like a network installer of `year`
pub fn installer_archive(year: u16) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    let files = [
        ("install-tl-20240312/install-tl".to_string(), "#!/usr/bin/env perl\n".to_string()),
        (
            "install-tl-20240312/release-texlive.txt".to_string(),
            format!("TeX Live (https://tug.org/texlive) version {}\n", year),
        ),
    ];
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn exit(code: i32, stderr: &str) -> ExecOutput {
    ExecOutput {
        exit_code: code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

pub fn stdout(text: &str) -> ExecOutput {
    ExecOutput {
        exit_code: 0,
        stdout: text.to_string(),
        stderr: String::new(),
    }
}

/// Answers invocations whose command line contains a pattern
///
/// Responses for one pattern are consumed in order; the last one repeats.
/// Anything unscripted succeeds silently. Every command line is recorded.
#[derive(Default)]
pub struct ScriptedRunner {
    script: Mutex<Vec<(String, VecDeque<ExecOutput>)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn on(self, pattern: &str, responses: Vec<ExecOutput>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push((pattern.to_string(), responses.into()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded command lines containing `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        _options: &ExecOptions,
    ) -> TlsetupResult<ExecOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let mut script = self.script.lock().unwrap();
        for (pattern, responses) in script.iter_mut() {
            if line.contains(pattern.as_str()) {
                let response = if responses.len() > 1 {
                    responses.pop_front()
                } else {
                    responses.front().cloned()
                };
                return Ok(response.unwrap_or_default());
            }
        }
        Ok(ExecOutput::default())
    }
}

/// `ToolCache` that records registrations without copying anything
#[derive(Default)]
pub struct MemoryToolCache {
    entries: Mutex<HashMap<(String, String), PathBuf>>,
    registered: Mutex<Vec<(String, String)>>,
    failing: bool,
    root: Option<PathBuf>,
}

impl MemoryToolCache {
    /// Every registration fails
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Copy registered trees under `root` instead of using them in place
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = Some(root);
        self
    }

    pub fn insert(&self, tool: &str, version: &str, dir: PathBuf) {
        self.entries
            .lock()
            .unwrap()
            .insert((tool.to_string(), version.to_string()), dir);
    }

    pub fn registered(&self) -> Vec<(String, String)> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolCache for MemoryToolCache {
    async fn find(&self, tool: &str, version: &str) -> Option<PathBuf> {
        self.entries
            .lock()
            .unwrap()
            .get(&(tool.to_string(), version.to_string()))
            .cloned()
    }

    async fn cache_dir(&self, source: &Path, tool: &str, version: &str) -> TlsetupResult<PathBuf> {
        if self.failing {
            return Err(TlsetupError::Internal("tool cache is read-only".to_string()));
        }
        self.registered
            .lock()
            .unwrap()
            .push((tool.to_string(), version.to_string()));
        match self.root {
            Some(ref root) => {
                let target = root.join(tool).join(version);
                crate::acquire::tool_cache::copy_tree(source, &target)?;
                Ok(target)
            }
            None => Ok(source.to_path_buf()),
        }
    }
}

/// `CacheStore` holding key names only
#[derive(Default)]
pub struct MemoryCacheStore {
    keys: Mutex<Vec<String>>,
    restores: Mutex<Vec<Vec<String>>>,
    saves: Mutex<Vec<String>>,
}

impl MemoryCacheStore {
    pub fn with_key(self, key: &str) -> Self {
        self.keys.lock().unwrap().push(key.to_string());
        self
    }

    /// Key lists passed to each restore, unique key first
    pub fn restores(&self) -> Vec<Vec<String>> {
        self.restores.lock().unwrap().clone()
    }

    pub fn saves(&self) -> Vec<String> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn restore(
        &self,
        _paths: &[PathBuf],
        unique_key: &str,
        restore_keys: &[String],
    ) -> TlsetupResult<Option<String>> {
        let mut tried = vec![unique_key.to_string()];
        tried.extend(restore_keys.iter().cloned());
        self.restores.lock().unwrap().push(tried);

        let keys = self.keys.lock().unwrap();
        if keys.iter().any(|k| k == unique_key) {
            return Ok(Some(unique_key.to_string()));
        }
        Ok(restore_keys
            .iter()
            .find_map(|prefix| keys.iter().rev().find(|k| k.starts_with(prefix.as_str())))
            .cloned())
    }

    async fn save(&self, _paths: &[PathBuf], key: &str) -> TlsetupResult<Option<u64>> {
        self.saves.lock().unwrap().push(key.to_string());
        let mut keys = self.keys.lock().unwrap();
        if keys.iter().any(|k| k == key) {
            return Ok(None);
        }
        keys.push(key.to_string());
        Ok(Some(1))
    }
}
