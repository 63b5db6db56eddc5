//! State of one interactive copy session.
//!
//! Every change goes through a transition method, and any change to a file or
//! a selection drops the previously produced result so that a stale file is
//! never offered as current.

use std::path::Path;
use std::sync::Arc;
use tokio::task;

use crate::config::SheetCopyConfig;
use crate::copy::{ColumnSelection, copy_between};
use crate::error::{FileRole, Result, SheetCopyError};
use crate::headers::WorkbookHeaders;
use crate::load::{LoadedFile, load_file};
use crate::reader::Workbook;

/// Whether a copy job is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Running,
}

/// File and selections for one side of the copy
#[derive(Debug, Clone, Default)]
pub struct Panel {
    file_name: Option<String>,
    workbook: Option<Arc<Workbook>>,
    headers: WorkbookHeaders,
    sheet: Option<String>,
    column: Option<String>,
}

impl Panel {
    fn from_loaded(loaded: LoadedFile) -> Self {
        Self {
            file_name: Some(loaded.file_name),
            workbook: Some(Arc::new(loaded.workbook)),
            headers: loaded.headers,
            sheet: None,
            column: None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.workbook.is_some()
    }

    pub fn headers(&self) -> &WorkbookHeaders {
        &self.headers
    }

    /// Sheet names to choose from
    pub fn sheet_options(&self) -> Vec<&str> {
        self.headers.sheet_names().collect()
    }

    /// Column labels of the selected sheet
    pub fn column_options(&self) -> &[String] {
        self.sheet
            .as_deref()
            .and_then(|sheet| self.headers.labels(sheet))
            .unwrap_or(&[])
    }

    pub fn selected_sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn selected_column(&self) -> Option<&str> {
        self.column.as_deref()
    }
}

/// A downloadable result
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    /// Suggested file name
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub copied_rows: usize,
    /// Human-readable summary
    pub message: String,
}

/// Everything a copy job needs, detached from the session
#[derive(Debug, Clone)]
pub struct CopyJob {
    generation: u64,
    source_workbook: Arc<Workbook>,
    target_workbook: Arc<Workbook>,
    source: ColumnSelection,
    target: ColumnSelection,
    config: SheetCopyConfig,
}

/// What a finished job hands back to the session
#[derive(Debug)]
pub struct JobOutcome {
    generation: u64,
    result: Result<ProcessedFile>,
}

/// Whether a finished job's outcome was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Applied,
    /// The session changed while the job ran; the outcome was dropped
    Superseded,
}

impl CopyJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run the copy on the blocking pool
    pub async fn run(self) -> JobOutcome {
        let generation = self.generation;
        let file_name = self.config.output_file_name.clone();

        let joined = task::spawn_blocking(move || {
            copy_between(
                &self.source_workbook,
                &self.target_workbook,
                &self.source,
                &self.target,
                &self.config,
            )
        })
        .await;

        let result = match joined {
            Ok(Ok(report)) => Ok(ProcessedFile {
                file_name,
                message: report.summary(),
                copied_rows: report.copied_rows,
                bytes: report.bytes,
            }),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(SheetCopyError::Task(e.to_string())),
        };

        JobOutcome { generation, result }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    config: SheetCopyConfig,
    source: Panel,
    target: Panel,
    status: ProcessingState,
    result: Option<ProcessedFile>,
    error: Option<String>,
    generation: u64,
}

impl Session {
    pub fn new(config: SheetCopyConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SheetCopyConfig {
        &self.config
    }

    pub fn panel(&self, role: FileRole) -> &Panel {
        match role {
            FileRole::Source => &self.source,
            FileRole::Target => &self.target,
        }
    }

    fn panel_mut(&mut self, role: FileRole) -> &mut Panel {
        match role {
            FileRole::Source => &mut self.source,
            FileRole::Target => &mut self.target,
        }
    }

    pub fn status(&self) -> ProcessingState {
        self.status
    }

    pub fn result(&self) -> Option<&ProcessedFile> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Drop the current result and abandon any running job
    fn invalidate(&mut self) {
        self.result = None;
        self.status = ProcessingState::Idle;
        self.generation += 1;
    }

    /// Back to the initial state. A job still running is abandoned.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Session::new(self.config.clone());
        self.generation = generation;
    }

    /// Record the outcome of loading a file for one side
    pub fn apply_load(&mut self, role: FileRole, loaded: Result<LoadedFile>) -> Result<()> {
        self.invalidate();
        match loaded {
            Ok(loaded) => {
                *self.panel_mut(role) = Panel::from_loaded(loaded);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                *self.panel_mut(role) = Panel::default();
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load a file from disk into one side
    pub async fn load(&mut self, role: FileRole, path: impl AsRef<Path>) -> Result<()> {
        let loaded = load_file(role, path).await;
        self.apply_load(role, loaded)
    }

    pub fn select_sheet(&mut self, role: FileRole, sheet: &str) -> Result<()> {
        let panel = self.panel(role);
        if !panel.headers.contains_sheet(sheet) {
            return Err(SheetCopyError::InvalidSheetSelection {
                role,
                sheet: sheet.to_string(),
            });
        }

        let panel = self.panel_mut(role);
        panel.sheet = Some(sheet.to_string());
        panel.column = None;
        self.invalidate();
        Ok(())
    }

    pub fn select_column(&mut self, role: FileRole, label: &str) -> Result<()> {
        let panel = self.panel(role);
        let Some(sheet) = panel.sheet.as_deref() else {
            return Err(SheetCopyError::MissingSelection {
                what: format!("{} sheet", role),
            });
        };
        if !panel.column_options().iter().any(|l| l == label) {
            return Err(SheetCopyError::ColumnNotFound {
                sheet: sheet.to_string(),
                label: label.to_string(),
            });
        }

        self.panel_mut(role).column = Some(label.to_string());
        self.invalidate();
        Ok(())
    }

    /// True when both files are loaded, all selections are made and no job runs
    pub fn can_process(&self) -> bool {
        self.status == ProcessingState::Idle
            && [&self.source, &self.target]
                .iter()
                .all(|p| p.is_loaded() && p.sheet.is_some() && p.column.is_some())
    }

    /// Start a copy job. The session is `Running` until [`Session::finish_process`].
    pub fn begin_process(&mut self) -> Result<CopyJob> {
        if self.status == ProcessingState::Running {
            return Err(SheetCopyError::JobInProgress);
        }

        let (source_workbook, source) = match Self::job_inputs(&self.source, FileRole::Source) {
            Ok(inputs) => inputs,
            Err(e) => return Err(self.record_error(e)),
        };
        let (target_workbook, target) = match Self::job_inputs(&self.target, FileRole::Target) {
            Ok(inputs) => inputs,
            Err(e) => return Err(self.record_error(e)),
        };

        self.generation += 1;
        self.status = ProcessingState::Running;
        self.error = None;

        Ok(CopyJob {
            generation: self.generation,
            source_workbook,
            target_workbook,
            source,
            target,
            config: self.config.clone(),
        })
    }

    fn job_inputs(panel: &Panel, role: FileRole) -> Result<(Arc<Workbook>, ColumnSelection)> {
        let missing = |what: &str| SheetCopyError::MissingSelection {
            what: format!("{} {}", role, what),
        };
        let workbook = panel.workbook.clone().ok_or_else(|| missing("file"))?;
        let sheet = panel.sheet.clone().ok_or_else(|| missing("sheet"))?;
        let column = panel.column.clone().ok_or_else(|| missing("column"))?;
        Ok((workbook, ColumnSelection { sheet, column }))
    }

    fn record_error(&mut self, err: SheetCopyError) -> SheetCopyError {
        self.error = Some(err.to_string());
        err
    }

    /// Store a finished job's outcome unless the session moved on meanwhile.
    /// On failure a previous result stays available next to the error.
    pub fn finish_process(&mut self, outcome: JobOutcome) -> Result<JobStatus> {
        if outcome.generation != self.generation {
            tracing::warn!(
                job = outcome.generation,
                current = self.generation,
                "dropping result of superseded copy job"
            );
            return Ok(JobStatus::Superseded);
        }

        self.status = ProcessingState::Idle;
        match outcome.result {
            Ok(file) => {
                tracing::info!(copied_rows = file.copied_rows, "{}", file.message);
                self.result = Some(file);
                self.error = None;
                Ok(JobStatus::Applied)
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Run a copy job to completion and return the new result
    pub async fn process(&mut self) -> Result<&ProcessedFile> {
        let job = self.begin_process()?;
        let outcome = job.run().await;
        self.finish_process(outcome)?;
        self.result
            .as_ref()
            .ok_or_else(|| SheetCopyError::Task("copy job produced no result".to_string()))
    }
}
