// Combination pipeline: load → reconcile → build → emit
//
// Runs synchronously on the calling thread, or on a worker thread through
// CombineJob for callers that must stay responsive.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use boqsheet_engine::eval::grand_total;
use boqsheet_engine::table::boq_names;
use boqsheet_engine::{build_with_labels, reconcile, BoqDocument, CancelToken, ProductId, Result, TableLabels};
use serde::Serialize;

use crate::store::load_all;
use crate::xlsx::{emit_with_style, EmitReport, SheetStyle};

#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    pub labels: TableLabels,
    pub style: SheetStyle,
}

/// A product whose snapshot differed between BoQs; the first one was kept.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotConflict {
    pub product: ProductId,
    pub kept_name: String,
    pub kept_from: String,
    pub differs_in: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombineReport {
    pub boqs: Vec<String>,
    pub unique_items: usize,
    pub grand_total: f64,
    pub conflicts: Vec<SnapshotConflict>,
    pub output: EmitReport,
}

/// Combine already-loaded documents into `dest`.
///
/// `cancel` is checked once before emission; the write itself is never
/// interrupted.
pub fn combine_documents(
    boqs: &[BoqDocument],
    dest: &Path,
    options: &CombineOptions,
    cancel: &CancelToken,
) -> Result<CombineReport> {
    let names = boq_names(boqs);
    let matrix = reconcile(boqs)?;
    let artifact = build_with_labels(&matrix, &names, &options.labels)?;

    let conflicts = matrix
        .conflicted_rows()
        .map(|row| SnapshotConflict {
            product: row.id.clone(),
            kept_name: row.name.clone(),
            kept_from: first_holder(boqs, &row.id),
            differs_in: row.conflicts.iter().map(|&i| names[i].clone()).collect(),
        })
        .collect();

    cancel.check()?;
    let output = emit_with_style(&artifact, dest, &options.style)?;

    Ok(CombineReport {
        boqs: names,
        unique_items: matrix.len(),
        grand_total: grand_total(&artifact),
        conflicts,
        output,
    })
}

fn first_holder(boqs: &[BoqDocument], id: &ProductId) -> String {
    boqs.iter()
        .find(|b| b.item(id).is_some())
        .map(|b| b.name.clone())
        .unwrap_or_default()
}

/// Load every file (checking `cancel` between files) and combine them.
pub fn combine_files(
    paths: &[PathBuf],
    dest: &Path,
    options: &CombineOptions,
    cancel: &CancelToken,
) -> Result<CombineReport> {
    let boqs = load_all(paths, cancel)?;
    combine_documents(&boqs, dest, options, cancel)
}

/// A combination running on a worker thread.
pub struct CombineJob {
    cancel: CancelToken,
    result: mpsc::Receiver<Result<CombineReport>>,
    handle: thread::JoinHandle<()>,
}

impl CombineJob {
    pub fn spawn(paths: Vec<PathBuf>, dest: PathBuf, options: CombineOptions) -> Self {
        Self::spawn_with_token(paths, dest, options, CancelToken::new())
    }

    /// Spawn with a caller-owned token, so cancellation can be wired up
    /// (or requested) before the worker starts.
    pub fn spawn_with_token(
        paths: Vec<PathBuf>,
        dest: PathBuf,
        options: CombineOptions,
        cancel: CancelToken,
    ) -> Self {
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = combine_files(&paths, &dest, &options, &worker_cancel);
            // Receiver may be gone if the caller dropped the job
            let _ = tx.send(result);
        });

        Self { cancel, result: rx, handle }
    }

    /// Request cancellation. Honoured between loads and before emission only.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Non-blocking poll; `wait` returns immediately once this is true.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker finishes.
    pub fn wait(self) -> Result<CombineReport> {
        match self.result.recv() {
            Ok(result) => {
                let _ = self.handle.join();
                result
            }
            Err(_) => match self.handle.join() {
                Err(panic) => std::panic::resume_unwind(panic),
                Ok(()) => unreachable!("worker exited without sending a result"),
            },
        }
    }
}
