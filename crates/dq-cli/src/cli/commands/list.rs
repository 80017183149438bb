//! `dq list` – print the queued URLs in order.

use anyhow::Result;
use dq_core::config::DqConfig;
use dq_core::queue::QueueStore;

pub fn run_list(cfg: &DqConfig) -> Result<()> {
    let queue = QueueStore::new(cfg.queue.clone());
    for url in queue.list()? {
        println!("{url}");
    }
    Ok(())
}
