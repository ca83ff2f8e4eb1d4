//! Background file loading.
//!
//! Acceptance and the full read run on one dedicated worker thread so the
//! UI never blocks on disk. Every job carries a generation number; the
//! viewer applies only the result matching its latest request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::acceptance::{accept, AcceptError};
use crate::candidate::CandidateFile;

/// Capacity of the job and result channels.
const CHANNEL_CAPACITY: usize = 4;

/// How long `Drop` waits for a busy worker before detaching it.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// A request to load one candidate.
#[derive(Debug, Clone)]
pub struct LoadJob {
    pub generation: u64,
    pub file: CandidateFile,
}

/// What happened to a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded {
        name: String,
        size: u64,
        text: String,
    },
    /// Acceptance said no.
    Rejected { name: String },
    /// Reading failed, either the sample or the full content.
    ReadFailed { name: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct LoadResult {
    pub generation: u64,
    pub outcome: LoadOutcome,
}

/// Accept and read `file`. Runs wherever it is called; the worker calls it
/// for queued jobs and the CLI path can call it directly in tests.
pub fn load_candidate(file: &CandidateFile) -> LoadOutcome {
    let name = file.display_name().to_string();
    match accept(file) {
        Ok(how) => log::debug!("{name} accepted ({how:?})"),
        Err(AcceptError::Unsupported { name }) => {
            log::info!("{name} rejected: not Markdown");
            return LoadOutcome::Rejected { name };
        }
        Err(AcceptError::Read(err)) => {
            log::warn!("sampling {name} failed: {err}");
            return LoadOutcome::ReadFailed {
                name,
                reason: err.to_string(),
            };
        }
    }

    match file.read_text() {
        Ok(text) => LoadOutcome::Loaded {
            name,
            size: file.size(),
            text,
        },
        Err(err) => {
            log::warn!("reading {name} failed: {err}");
            LoadOutcome::ReadFailed {
                name,
                reason: err.to_string(),
            }
        }
    }
}

/// Owns the loader thread and its channels.
pub struct Loader {
    job_tx: Option<Sender<LoadJob>>,
    /// Second handle on the job queue, used to evict superseded jobs when
    /// the queue is full.
    job_rx: Receiver<LoadJob>,
    result_rx: Receiver<LoadResult>,
    /// Newest generation the viewer cares about. Older jobs are skipped.
    latest: Arc<AtomicU64>,
    worker_handle: Option<JoinHandle<()>>,
}

impl Loader {
    /// Start the worker. `repaint` is poked after each result so an idle UI
    /// wakes up to show it.
    pub fn new(repaint: Option<egui::Context>) -> std::io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let (result_tx, result_rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let latest = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            jobs: job_rx.clone(),
            results: result_tx,
            evict: result_rx.clone(),
            latest: Arc::clone(&latest),
            repaint,
        };
        let worker_handle = std::thread::Builder::new()
            .name("mddrop-loader".into())
            .spawn(move || worker.run())?;

        Ok(Self {
            job_tx: Some(job_tx),
            job_rx,
            result_rx,
            latest,
            worker_handle: Some(worker_handle),
        })
    }

    /// Mark every generation before `generation` as superseded. Queued jobs
    /// for those generations are skipped and their results never sent.
    pub fn supersede(&self, generation: u64) {
        self.latest.fetch_max(generation, Ordering::AcqRel);
    }

    /// Queue a job, superseding everything queued before it. A full queue
    /// makes room by evicting the oldest queued job. Returns false only
    /// when the worker is gone.
    pub fn submit(&self, job: LoadJob) -> bool {
        let Some(tx) = &self.job_tx else {
            return false;
        };
        self.supersede(job.generation);
        let mut job = job;
        loop {
            match tx.try_send(job) {
                Ok(()) => return true,
                Err(TrySendError::Full(pending)) => {
                    // Everything still queued is older than `pending`.
                    if let Ok(evicted) = self.job_rx.try_recv() {
                        log::debug!("evicting queued generation {}", evicted.generation);
                    }
                    job = pending;
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::error!("loader worker is gone");
                    return false;
                }
            }
        }
    }

    /// Drain every result that has arrived since the last poll.
    pub fn poll(&self) -> Vec<LoadResult> {
        let mut results = Vec::new();
        loop {
            match self.result_rx.try_recv() {
                Ok(result) => results.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        results
    }

    /// Block until one result arrives. Used by tests and the integration
    /// suite.
    pub fn wait(&self, timeout: Duration) -> Option<LoadResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        // Closing the job channel ends the worker's recv loop.
        self.job_tx.take();
        self.supersede(u64::MAX);
        let Some(handle) = self.worker_handle.take() else {
            return;
        };
        // A read stuck on a hung share or a FIFO must not keep the window
        // from closing.
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                log::warn!("loader worker still busy at shutdown, detaching it");
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        let _ = handle.join();
    }
}

/// State moved onto the loader thread.
struct Worker {
    jobs: Receiver<LoadJob>,
    results: Sender<LoadResult>,
    /// Lets the worker drop already-delivered results nobody polled.
    evict: Receiver<LoadResult>,
    latest: Arc<AtomicU64>,
    repaint: Option<egui::Context>,
}

impl Worker {
    fn is_superseded(&self, generation: u64) -> bool {
        generation < self.latest.load(Ordering::Acquire)
    }

    /// Receives jobs until the sender is dropped.
    fn run(self) {
        while let Ok(job) = self.jobs.recv() {
            if self.is_superseded(job.generation) {
                log::debug!("skipping superseded generation {}", job.generation);
                continue;
            }
            let outcome = load_candidate(&job.file);
            if self.is_superseded(job.generation) {
                log::debug!("dropping result of superseded generation {}", job.generation);
                continue;
            }
            if !self.deliver(LoadResult {
                generation: job.generation,
                outcome,
            }) {
                break;
            }
            if let Some(ctx) = &self.repaint {
                ctx.request_repaint();
            }
        }
        log::debug!("loader worker exiting");
    }

    /// Send `result`, evicting older unpolled results when the channel is
    /// full. Returns false once the loader is gone.
    fn deliver(&self, mut result: LoadResult) -> bool {
        loop {
            match self.results.try_send(result) {
                Ok(()) => return true,
                Err(TrySendError::Full(pending)) => {
                    if let Ok(evicted) = self.evict.try_recv() {
                        log::debug!("evicting unpolled result for generation {}", evicted.generation);
                    }
                    result = pending;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory(name: &str, body: &str) -> CandidateFile {
        CandidateFile::from_bytes(Some(name.to_string()), Arc::from(body.as_bytes()))
    }

    #[test]
    fn test_load_candidate_outcomes() {
        assert_eq!(
            load_candidate(&memory("a.md", "# A")),
            LoadOutcome::Loaded {
                name: "a.md".into(),
                size: 3,
                text: "# A".into(),
            }
        );
        assert_eq!(
            load_candidate(&memory("notes.txt", "plain prose only")),
            LoadOutcome::Rejected {
                name: "notes.txt".into()
            }
        );
        assert!(matches!(
            load_candidate(&CandidateFile::from_path("/nonexistent/x.md")),
            LoadOutcome::ReadFailed { ref name, .. } if name == "x.md"
        ));
    }

    #[test]
    fn test_worker_round_trip() -> anyhow::Result<()> {
        let mut temp = tempfile::Builder::new().suffix(".md").tempfile()?;
        temp.write_all(b"# From disk\n")?;
        temp.flush()?;

        let loader = Loader::new(None)?;
        assert!(loader.submit(LoadJob {
            generation: 7,
            file: CandidateFile::from_path(temp.path()),
        }));
        let result = loader
            .wait(Duration::from_secs(5))
            .ok_or_else(|| anyhow::anyhow!("no result from worker"))?;
        assert_eq!(result.generation, 7);
        assert!(matches!(
            result.outcome,
            LoadOutcome::Loaded { ref text, .. } if text == "# From disk\n"
        ));
        assert!(loader.poll().is_empty());
        Ok(())
    }

    #[test]
    fn test_newest_submission_is_always_delivered() -> anyhow::Result<()> {
        let loader = Loader::new(None)?;
        for generation in 1..=3 {
            assert!(loader.submit(LoadJob {
                generation,
                file: memory("n.md", "x"),
            }));
        }
        let mut seen = Vec::new();
        while seen.last() != Some(&3) {
            let result = loader
                .wait(Duration::from_secs(5))
                .ok_or_else(|| anyhow::anyhow!("worker stalled"))?;
            seen.push(result.generation);
        }
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
        Ok(())
    }

    #[test]
    fn test_superseded_job_is_skipped() -> anyhow::Result<()> {
        let loader = Loader::new(None)?;
        loader.supersede(5);
        assert!(loader.submit(LoadJob {
            generation: 4,
            file: memory("old.md", "x"),
        }));
        assert!(loader.submit(LoadJob {
            generation: 5,
            file: memory("new.md", "y"),
        }));
        let result = loader
            .wait(Duration::from_secs(5))
            .ok_or_else(|| anyhow::anyhow!("worker stalled"))?;
        assert_eq!(result.generation, 5);
        Ok(())
    }

    #[test]
    fn test_deliver_evicts_unpolled_results() -> anyhow::Result<()> {
        let loader = Loader::new(None)?;
        for generation in 1..=(CHANNEL_CAPACITY as u64 + 3) {
            assert!(loader.submit(LoadJob {
                generation,
                file: memory("n.md", "x"),
            }));
            // Let the worker answer each one without anyone polling.
            std::thread::sleep(Duration::from_millis(20));
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        let newest = CHANNEL_CAPACITY as u64 + 3;
        let mut seen = Vec::new();
        while seen.last() != Some(&newest) {
            anyhow::ensure!(Instant::now() < deadline, "newest result never arrived");
            seen.extend(loader.poll().into_iter().map(|r| r.generation));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
        Ok(())
    }

    #[cfg(unix)]
    fn make_fifo(path: &std::path::Path) -> anyhow::Result<()> {
        let status = std::process::Command::new("mkfifo").arg(path).status()?;
        anyhow::ensure!(status.success(), "mkfifo failed for {}", path.display());
        Ok(())
    }

    /// Opening the FIFO for writing releases a reader blocked in `open`.
    /// Runs on its own thread so a reader that never arrives cannot hang
    /// the test.
    #[cfg(unix)]
    fn release_fifo(path: std::path::PathBuf) {
        std::thread::spawn(move || {
            if let Ok(mut fifo) = std::fs::OpenOptions::new().write(true).open(&path) {
                let _ = fifo.write_all(b"# slow\n");
            }
        });
    }

    #[cfg(unix)]
    fn wait_until_taken(loader: &Loader) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !loader.job_rx.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    #[cfg(unix)]
    #[test]
    fn test_blocked_worker_still_delivers_latest_job() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let fifo = dir.path().join("slow.md");
        make_fifo(&fifo)?;

        let loader = Loader::new(None)?;
        assert!(loader.submit(LoadJob {
            generation: 1,
            file: CandidateFile::from_path(&fifo),
        }));
        wait_until_taken(&loader);

        let newest = CHANNEL_CAPACITY as u64 + 2;
        for generation in 2..=newest {
            assert!(
                loader.submit(LoadJob {
                    generation,
                    file: memory(&format!("n{generation}.md"), "# good"),
                }),
                "generation {generation} was refused"
            );
        }
        assert!(loader.job_rx.len() <= CHANNEL_CAPACITY);

        release_fifo(fifo);
        let result = loader
            .wait(Duration::from_secs(5))
            .ok_or_else(|| anyhow::anyhow!("newest job never ran"))?;
        assert_eq!(result.generation, newest);
        assert!(matches!(
            result.outcome,
            LoadOutcome::Loaded { ref text, .. } if text == "# good"
        ));
        assert!(loader.wait(Duration::from_millis(100)).is_none());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_drop_does_not_wait_for_blocked_worker() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let fifo = dir.path().join("stuck.md");
        make_fifo(&fifo)?;

        let loader = Loader::new(None)?;
        assert!(loader.submit(LoadJob {
            generation: 1,
            file: CandidateFile::from_path(&fifo),
        }));
        wait_until_taken(&loader);

        let started = Instant::now();
        drop(loader);
        assert!(started.elapsed() < Duration::from_secs(3));

        release_fifo(fifo);
        Ok(())
    }

    #[test]
    fn test_drop_joins_worker() -> anyhow::Result<()> {
        let loader = Loader::new(None)?;
        loader.submit(LoadJob {
            generation: 1,
            file: memory("a.md", "x"),
        });
        drop(loader);
        Ok(())
    }
}
