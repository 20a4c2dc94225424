//! Interrupt worker threads
//!
//! A thread owns one [`IrqServerNode`] and a spawned worker that blocks on
//! the node's notification. What the worker does with a badge word depends
//! on its [`DispatchMode`]: run the callbacks itself, or forward the word
//! over an endpoint so a single receiver can run every node's callbacks in
//! one place.

use alloc::boxed::Box;
use alloc::sync::Arc;

use k2_cap::objects::{Endpoint, Tcb};
use k2_cap::{Badge, CPtr, IrqLine};
use k2_syscall::{IpcMessage, KernelOps, SyscallResult};
use spin::mutex::SpinMutex;

use crate::error::IrqServerResult;
use crate::node::{IrqCallback, IrqServerNode};

/// What a worker does with the badge words it collects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Run the callbacks on the worker thread itself.
    Direct,
    /// Send `[thread index, badge word, 0]` under `label` to `endpoint`
    /// and let the receiver drive the callbacks.
    Forward {
        /// Endpoint the badge words are sent to.
        endpoint: CPtr<Endpoint>,
        /// Message label marking the sends as interrupt traffic.
        label: u64,
    },
}

/// An [`IrqServerNode`] serviced by its own worker thread.
pub struct IrqServerThread<K: KernelOps + 'static> {
    index: usize,
    node: Arc<SpinMutex<IrqServerNode<K>>>,
    mode: DispatchMode,
    tcb: CPtr<Tcb>,
}

impl<K: KernelOps + 'static> IrqServerThread<K> {
    /// Create the node and spawn its worker.
    ///
    /// `index` identifies this thread in forwarded messages; the caller
    /// keeps it unique. The worker starts immediately and blocks on the
    /// fresh notification until a line is registered and fires.
    pub fn spawn(
        ops: Arc<K>,
        index: usize,
        badge_mask: Badge,
        mode: DispatchMode,
        priority: u8,
    ) -> IrqServerResult<Self> {
        let notification = ops.create_notification()?;
        let node = Arc::new(SpinMutex::new(IrqServerNode::new(
            Arc::clone(&ops),
            notification,
            badge_mask,
        )?));

        let worker_ops = Arc::clone(&ops);
        let worker_node = Arc::clone(&node);
        let tcb = ops.spawn_thread(
            "irq-worker",
            priority,
            Box::new(move || worker_loop(worker_ops, worker_node, index, mode)),
        )?;

        Ok(Self {
            index,
            node,
            mode,
            tcb,
        })
    }

    /// Register a callback for a line on this thread's node.
    pub fn register(&self, line: IrqLine, callback: IrqCallback<K>) -> IrqServerResult<Badge> {
        self.node.lock().register(line, callback)
    }

    /// Remove a line from this thread's node.
    pub fn unregister(&self, line: IrqLine) -> IrqServerResult<()> {
        self.node.lock().unregister(line)
    }

    /// Check whether this thread's node holds a line.
    #[must_use]
    pub fn has_line(&self, line: IrqLine) -> bool {
        self.node.lock().has_line(line)
    }

    /// Check whether this thread's node has no badge bits left.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.node.lock().is_full()
    }

    /// Number of lines registered on this thread's node.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.node.lock().line_count()
    }

    /// The shared node, for servicing forwarded badge words.
    #[inline]
    #[must_use]
    pub fn node(&self) -> &Arc<SpinMutex<IrqServerNode<K>>> {
        &self.node
    }

    /// This thread's index in forwarded messages.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// How this thread's worker dispatches.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// The worker's TCB capability.
    #[inline]
    #[must_use]
    pub fn tcb(&self) -> CPtr<Tcb> {
        self.tcb
    }
}

fn worker_loop<K: KernelOps>(
    ops: Arc<K>,
    node: Arc<SpinMutex<IrqServerNode<K>>>,
    index: usize,
    mode: DispatchMode,
) {
    log::debug!("interrupt worker {} running", index);
    loop {
        if let Err(err) = service_turn(ops.as_ref(), &node, index, mode) {
            log::error!("interrupt worker {} stopping: {}", index, err);
            break;
        }
    }
}

/// One wait-and-dispatch round of a worker.
pub(crate) fn service_turn<K: KernelOps>(
    ops: &K,
    node: &SpinMutex<IrqServerNode<K>>,
    index: usize,
    mode: DispatchMode,
) -> SyscallResult<u32> {
    // The wait must happen outside the node lock so registrations from
    // other threads can proceed while the worker blocks.
    let notification = node.lock().notification();
    let word = ops.wait(notification)?;
    match mode {
        DispatchMode::Direct => Ok(node.lock().service(word)),
        DispatchMode::Forward { endpoint, label } => {
            ops.send(
                endpoint,
                IpcMessage::new(label, [index as u64, word.value(), 0]),
            )?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockKernel;

    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicU32, Ordering};

    use k2_syscall::SyscallError;

    #[test]
    fn test_spawn_creates_worker() {
        let ops = Arc::new(MockKernel::new());
        let thread =
            IrqServerThread::spawn(Arc::clone(&ops), 0, Badge::MAX, DispatchMode::Direct, 200)
                .unwrap();
        assert_eq!(ops.spawned(), alloc::vec![("irq-worker", 200)]);
        assert_eq!(thread.index(), 0);
        assert_eq!(thread.line_count(), 0);
        assert!(!thread.is_full());
    }

    #[test]
    fn test_service_turn_direct() {
        let ops = Arc::new(MockKernel::new());
        let thread =
            IrqServerThread::spawn(Arc::clone(&ops), 0, Badge::MAX, DispatchMode::Direct, 200)
                .unwrap();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let badge = thread
            .register(
                17,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        ops.script_wait(thread.node().lock().notification(), badge);
        let handled =
            service_turn(ops.as_ref(), thread.node(), 0, DispatchMode::Direct).unwrap();
        assert_eq!(handled, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_service_turn_forward() {
        let ops = Arc::new(MockKernel::new());
        let endpoint = ops.create_endpoint().unwrap();
        let mode = DispatchMode::Forward {
            endpoint,
            label: 0xCAFE,
        };
        let thread = IrqServerThread::spawn(Arc::clone(&ops), 3, Badge::MAX, mode, 200).unwrap();
        let badge = thread.register(17, Box::new(|_| {})).unwrap();

        ops.script_wait(thread.node().lock().notification(), badge);
        let handled = service_turn(ops.as_ref(), thread.node(), 3, mode).unwrap();
        // Forwarding defers the callbacks to the receiver.
        assert_eq!(handled, 0);

        let sent = ops.sent();
        assert_eq!(sent.len(), 1);
        let (dest, message) = &sent[0];
        assert_eq!(*dest, endpoint.raw());
        assert_eq!(message.label, 0xCAFE);
        assert_eq!(message.regs, [3, badge.value(), 0]);
    }

    #[test]
    fn test_service_turn_propagates_wait_error() {
        let ops = Arc::new(MockKernel::new());
        let thread =
            IrqServerThread::spawn(Arc::clone(&ops), 0, Badge::MAX, DispatchMode::Direct, 200)
                .unwrap();
        // Nothing scripted: the wait fails.
        let err = service_turn(ops.as_ref(), thread.node(), 0, DispatchMode::Direct).unwrap_err();
        assert_eq!(err, SyscallError::WouldBlock);
    }

    #[test]
    fn test_worker_runs_until_wait_fails() {
        let ops = Arc::new(MockKernel::new());
        let thread =
            IrqServerThread::spawn(Arc::clone(&ops), 0, Badge::MAX, DispatchMode::Direct, 200)
                .unwrap();
        let seen: Arc<SpinMutex<Vec<IrqLine>>> = Arc::new(SpinMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let badge = thread
            .register(
                25,
                Box::new(move |ctx| {
                    sink.lock().push(ctx.line());
                }),
            )
            .unwrap();

        let notification = thread.node().lock().notification();
        ops.script_wait(notification, badge);
        ops.script_wait(notification, badge);

        // Run the captured worker body on this thread; it services both
        // scripted words, then the failing wait stops the loop.
        let entry = ops.take_spawn_entry().unwrap();
        entry();
        assert_eq!(seen.lock().as_slice(), &[25, 25]);
    }
}
