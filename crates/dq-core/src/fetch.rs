//! The fetcher seam and its curl implementation.
//!
//! The run loop only sees [`Fetcher`]; the production implementation shells
//! out to the external `curl` binary and maps its exit status onto
//! [`FetchOutcome`]. Transfer failures are outcomes, never errors — the run
//! loop feeds them to the retry ledger.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::DqConfig;
use crate::filename;

/// curl exit code for "server does not support byte ranges" (a failed
/// `-C -` resume).
const CURL_RANGE_ERROR: i32 = 33;

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Transfer finished; `path` is the downloaded file.
    Success { path: PathBuf },
    /// A resume was requested but the server rejected the range request.
    ResumeUnsupported,
    /// The fetch tool exited nonzero with the given code.
    HttpFailure(i32),
    /// The fetch tool could not be spawned or died without an exit code.
    OtherFailure,
}

/// External collaborator that attempts one job key.
pub trait Fetcher {
    fn fetch(&self, key: &str) -> FetchOutcome;
}

/// Fetcher that invokes the `curl` binary as a subprocess.
pub struct CurlFetcher {
    dest: PathBuf,
    extra_args: Vec<String>,
    auth: HashMap<String, String>,
    resume_restart_counts: bool,
}

impl CurlFetcher {
    pub fn new(cfg: &DqConfig) -> Self {
        CurlFetcher {
            dest: cfg.dest.clone(),
            extra_args: cfg.curl_args.clone(),
            auth: cfg.auth.clone(),
            resume_restart_counts: cfg.resume_restart_counts,
        }
    }

    /// Arguments common to every curl invocation for `key`: follow redirects
    /// (trusting them with credentials, as the queue is operator-curated),
    /// operator-supplied extras, and per-host authentication.
    fn base_args(&self, key: &str) -> Vec<String> {
        let mut args = vec!["--location-trusted".to_string()];
        args.extend(self.extra_args.iter().cloned());
        args.extend(self.auth_args(key));
        args
    }

    /// `-u user:password` when the config has an auth entry naming this
    /// URL's host. Entries are `host -> "user password"`.
    fn auth_args(&self, key: &str) -> Vec<String> {
        let Some(host) = url::Url::parse(key)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
        else {
            return Vec::new();
        };
        for (auth_host, creds) in &self.auth {
            if !auth_host.contains(host.as_str()) {
                continue;
            }
            let Some((user, password)) = creds.split_once(char::is_whitespace) else {
                tracing::warn!(entry = %auth_host, "auth entry must be \"user password\", ignoring");
                return Vec::new();
            };
            return vec!["-u".to_string(), format!("{}:{}", user, password.trim())];
        }
        Vec::new()
    }

    /// Destination path for `key`: a HEAD probe for a Content-Disposition
    /// filename, then the URL path, then a generated name.
    fn destination(&self, key: &str) -> PathBuf {
        let disposition = self.probe_content_disposition(key);
        let name = filename::derive(key, disposition.as_deref()).unwrap_or_else(|| {
            let name = generated_name();
            tracing::debug!(key, name, "no filename hint, using generated name");
            name
        });
        self.dest.join(name)
    }

    fn probe_content_disposition(&self, key: &str) -> Option<String> {
        let output = Command::new("curl")
            .args(self.base_args(key))
            .arg("-Is")
            .arg(key)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let headers = String::from_utf8_lossy(&output.stdout);
        for line in headers.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case("content-disposition") {
                return Some(value.trim().to_string());
            }
        }
        None
    }
}

impl Fetcher for CurlFetcher {
    fn fetch(&self, key: &str) -> FetchOutcome {
        let target = self.destination(key);
        let mut resume = target.exists();
        let mut restarted = false;

        loop {
            let mut cmd = Command::new("curl");
            cmd.args(self.base_args(key)).arg("-o").arg(&target);
            if resume {
                cmd.arg("-C").arg("-");
            }
            cmd.arg(key);

            tracing::info!(key, target = %target.display(), resume, "invoking curl");
            let status = match cmd.status() {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(key, error = %e, "could not spawn curl");
                    return FetchOutcome::OtherFailure;
                }
            };

            if status.success() {
                return FetchOutcome::Success { path: target };
            }
            match status.code() {
                Some(CURL_RANGE_ERROR) if resume && !restarted => {
                    if self.resume_restart_counts {
                        // Drop the partial file so the next attempt starts
                        // clean instead of hitting the same range error.
                        let _ = fs::remove_file(&target);
                        return FetchOutcome::ResumeUnsupported;
                    }
                    tracing::warn!(key, "server does not support resume, restarting from scratch");
                    resume = false;
                    restarted = true;
                }
                Some(code) => return FetchOutcome::HttpFailure(code),
                None => return FetchOutcome::OtherFailure,
            }
        }
    }
}

fn generated_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("download-{:x}", nanos)
}
