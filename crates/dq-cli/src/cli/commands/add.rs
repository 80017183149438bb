//! `dq add <url>...` – append URLs to the queue.

use anyhow::{bail, Result};
use dq_core::config::DqConfig;
use dq_core::queue::QueueStore;

pub fn run_add(cfg: &DqConfig, urls: &[String]) -> Result<()> {
    for url in urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("not an HTTP(S) URL: {url}");
        }
    }
    let queue = QueueStore::new(cfg.queue.clone());
    queue.append(urls)?;
    for url in urls {
        println!("queued {url}");
    }
    Ok(())
}
