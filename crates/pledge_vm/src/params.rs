use std::any::Any;

use crate::Vm;
use crate::job::JobQueue;
use crate::pledge::Pledge;
use crate::value::Value;

pub type UnhandledRejectionCallback = fn(vm: &mut Vm, pledge: &Pledge, reason: &Value);
pub type UnhandledTaskException = fn(vm: &mut Vm, exception: Value);

#[derive(Default)]
pub struct VmParams {
    job_queue: Option<Box<dyn JobQueue>>,
    unhandled_rejection_callback: Option<UnhandledRejectionCallback>,
    unhandled_task_exception_callback: Option<UnhandledTaskException>,
    state: Option<Box<dyn Any>>,
}

impl VmParams {
    pub fn new() -> Self {
        VmParams::default()
    }

    /// Replaces the default FIFO microtask queue.
    pub fn set_job_queue(mut self, queue: Box<dyn JobQueue>) -> Self {
        self.job_queue = Some(queue);
        self
    }

    pub(crate) fn take_job_queue(&mut self) -> Option<Box<dyn JobQueue>> {
        self.job_queue.take()
    }

    /// Called when a pledge is rejected while nothing is attached to it.
    /// The callback is observational: it cannot change the pledge.
    pub fn set_unhandled_rejection_callback(mut self, callback: UnhandledRejectionCallback) -> Self {
        self.unhandled_rejection_callback = Some(callback);
        self
    }

    pub fn unhandled_rejection_callback(&self) -> Option<UnhandledRejectionCallback> {
        self.unhandled_rejection_callback
    }

    pub fn set_unhandled_task_exception_callback(mut self, callback: UnhandledTaskException) -> Self {
        self.unhandled_task_exception_callback = Some(callback);
        self
    }

    pub fn unhandled_task_exception_callback(&self) -> Option<UnhandledTaskException> {
        self.unhandled_task_exception_callback
    }

    pub fn set_state(mut self, state: Box<dyn Any>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.state.as_ref().and_then(|s| s.downcast_ref::<T>())
    }
}
