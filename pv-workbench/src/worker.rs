//! Background extraction worker.
//!
//! Runs one extraction at a time on its own thread so a caller that must
//! stay responsive can submit a job, show a busy state and collect the
//! outcome later. A second job is refused until the first outcome has been
//! collected.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, info, warn};
use pv_extractor::{
    ExtractionError, ExtractionInputs, ExtractionReport, ExtractionSession, SolverSettings,
};
use thiserror::Error;

/// Error talking to the worker thread
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("an extraction is already running")]
    Busy,

    #[error("no extraction has been submitted")]
    Idle,

    #[error("extraction worker has shut down")]
    Disconnected,
}

/// One extraction request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionJob {
    pub inputs: ExtractionInputs,
    pub settings: SolverSettings,
}

impl ExtractionJob {
    pub fn new(inputs: ExtractionInputs, settings: SolverSettings) -> Self {
        Self { inputs, settings }
    }

    /// Run the job synchronously on the calling thread
    pub fn run(&self) -> Result<ExtractionReport, ExtractionError> {
        let (mut session, seed) = ExtractionSession::from_inputs(&self.inputs, &self.settings);
        session.extract_report(&seed)
    }
}

/// What the worker sends back for each job
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub job: ExtractionJob,
    pub report: Result<ExtractionReport, ExtractionError>,
}

/// Handle to the extraction thread
pub struct ExtractionWorker {
    sender: Sender<ExtractionJob>,
    outcomes: Receiver<ExtractionOutcome>,
    busy: AtomicBool,
    handle: Option<JoinHandle<()>>,
}

impl ExtractionWorker {
    /// Start the worker thread
    pub fn spawn() -> Self {
        let (sender, jobs) = bounded::<ExtractionJob>(1);
        let (outcome_sender, outcomes) = bounded::<ExtractionOutcome>(1);

        let handle = std::thread::spawn(move || {
            info!("Extraction worker started");
            while let Ok(job) = jobs.recv() {
                debug!("Extraction job received: {:?}", job.inputs);
                let report = job.run();
                if let Err(e) = &report {
                    warn!("Extraction failed: {e}");
                }

                if outcome_sender.send(ExtractionOutcome { job, report }).is_err() {
                    break;
                }
            }
            info!("Extraction worker shutting down");
        });

        Self {
            sender,
            outcomes,
            busy: AtomicBool::new(false),
            handle: Some(handle),
        }
    }

    /// True from a successful [`Self::submit`] until its outcome is received
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Queue `job`; fails with [`WorkerError::Busy`] while a previous job's
    /// outcome is outstanding
    pub fn submit(&self, job: ExtractionJob) -> Result<(), WorkerError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }

        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.busy.store(false, Ordering::Release);
                Err(WorkerError::Busy)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::Release);
                Err(WorkerError::Disconnected)
            }
        }
    }

    /// Block until the outstanding job's outcome arrives; fails with
    /// [`WorkerError::Idle`] when nothing was submitted
    pub fn recv(&self) -> Result<ExtractionOutcome, WorkerError> {
        if !self.is_busy() {
            return Err(WorkerError::Idle);
        }

        let outcome = self
            .outcomes
            .recv()
            .map_err(|_| WorkerError::Disconnected)?;
        self.busy.store(false, Ordering::Release);
        Ok(outcome)
    }

    /// The outstanding job's outcome if it is ready
    pub fn try_recv(&self) -> Result<Option<ExtractionOutcome>, WorkerError> {
        match self.outcomes.try_recv() {
            Ok(outcome) => {
                self.busy.store(false, Ordering::Release);
                Ok(Some(outcome))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Submit `job` and wait for its outcome
    pub fn run(&self, job: ExtractionJob) -> Result<ExtractionOutcome, WorkerError> {
        self.submit(job)?;
        self.recv()
    }

    /// Stop accepting jobs and join the thread
    pub fn wait_for_completion(mut self) {
        self.shutdown();
        info!("Extraction worker completed");
    }

    fn shutdown(&mut self) {
        // A sender with no receiver; dropping the real one ends the worker loop
        let (closed, _) = bounded(0);
        mem::drop(mem::replace(&mut self.sender, closed));

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                warn!("Extraction worker panicked: {e:?}");
            }
        }
    }
}

impl Drop for ExtractionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
