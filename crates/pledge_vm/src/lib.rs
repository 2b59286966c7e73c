use self::job::{Job, JobQueue, MicrotaskQueue};
use self::params::VmParams;
use self::pledge::Pledge;
use self::statics::Statics;
use self::value::Value;

pub mod error;
pub mod job;
pub mod js_std;
mod macros;
pub mod params;
pub mod pledge;
pub mod statics;
pub mod value;

#[cfg(test)]
mod test;

/// Owns everything that outlives a single pledge: the job queue, the builtin function objects
/// and the host callbacks. Every operation that can run user code takes `&mut Vm`.
pub struct Vm {
    jobs: Box<dyn JobQueue>,
    statics: Statics,
    params: VmParams,
}

impl Vm {
    pub fn new(mut params: VmParams) -> Self {
        let jobs = params
            .take_job_queue()
            .unwrap_or_else(|| Box::new(MicrotaskQueue::new()));

        Self {
            jobs,
            statics: Statics::new(),
            params,
        }
    }

    pub fn statics(&self) -> &Statics {
        &self.statics
    }

    pub fn params(&self) -> &VmParams {
        &self.params
    }

    /// Schedules a job. It never runs before [`Vm::process_jobs`] is called.
    pub fn enqueue_job(&mut self, job: Job) {
        pledge_log::trace!(kind = job.kind_name(), "enqueue job");
        self.jobs.enqueue(job);
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Runs queued jobs in FIFO order until the queue is empty, including jobs enqueued while
    /// draining. Returns the number of jobs that ran.
    pub fn process_jobs(&mut self) -> usize {
        let span = pledge_log::span!(pledge_log::Level::DEBUG, "process_jobs");
        let _entered = span.enter();

        let mut processed = 0;
        while let Some(job) = self.jobs.dequeue() {
            pledge_log::debug!(kind = job.kind_name(), "running job");
            if let Err(exception) = job.run(self) {
                self.report_task_exception(exception);
            }
            processed += 1;
        }

        pledge_log::debug!(processed, "job queue drained");
        processed
    }

    pub(crate) fn track_unhandled_rejection(&mut self, pledge: &Pledge, reason: &Value) {
        match self.params.unhandled_rejection_callback() {
            Some(callback) => callback(self, pledge, reason),
            None => pledge_log::warn!("Uncaught (in pledge) {}", reason),
        }
    }

    fn report_task_exception(&mut self, exception: Value) {
        match self.params.unhandled_task_exception_callback() {
            Some(callback) => callback(self, exception),
            None => pledge_log::error!("Uncaught exception in job: {}", exception),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmParams::default())
    }
}
