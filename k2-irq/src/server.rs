//! Top-level interrupt server
//!
//! The server owns a collection of [`IrqServerThread`]s whose workers all
//! forward onto one endpoint. The caller sits in [`IrqServer::wait_for_irq`]
//! on that endpoint: messages carrying the server's label are decoded and
//! dispatched to the owning node's callbacks, anything else is handed back
//! untouched so the endpoint can keep serving ordinary IPC as well.
//!
//! Registration finds the first thread with a free badge bit. When every
//! thread is full, a [`Capacity::Dynamic`] server spawns another worker;
//! a [`Capacity::Fixed`] server refuses.

use alloc::sync::Arc;
use alloc::vec::Vec;

use k2_cap::objects::Endpoint;
use k2_cap::{Badge, CPtr, IrqLine};
use k2_syscall::{Delivery, KernelOps};

use crate::error::{IrqServerError, IrqServerResult};
use crate::node::IrqCallback;
use crate::thread::{DispatchMode, IrqServerThread};

/// How many interrupt lines a server will accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capacity {
    /// At most this many lines; enough workers are spawned up front and
    /// no more are ever added. `Fixed(0)` is a server that accepts
    /// nothing.
    Fixed(usize),
    /// No limit; workers are spawned one at a time as lines fill them.
    Dynamic,
}

/// What [`IrqServer::wait_for_irq`] saw on the endpoint.
#[derive(Debug)]
pub enum WaitOutcome {
    /// An interrupt message: its callbacks ran, this many of them.
    Handled(u32),
    /// Unrelated IPC for the caller to process.
    Foreign(Delivery),
}

/// A collection of interrupt worker threads behind one endpoint.
pub struct IrqServer<K: KernelOps + 'static> {
    ops: Arc<K>,
    endpoint: CPtr<Endpoint>,
    label: u64,
    priority: u8,
    capacity: Capacity,
    threads: Vec<IrqServerThread<K>>,
}

impl<K: KernelOps + 'static> IrqServer<K> {
    /// Create a server forwarding to `endpoint` under `label`.
    ///
    /// Workers are spawned at `priority`. A fixed-capacity server spawns
    /// every worker it will ever need here, so a line registration can
    /// only fail for capacity reasons, never for lack of kernel memory.
    pub fn new(
        ops: Arc<K>,
        endpoint: CPtr<Endpoint>,
        label: u64,
        priority: u8,
        capacity: Capacity,
    ) -> IrqServerResult<Self> {
        let mut server = Self {
            ops,
            endpoint,
            label,
            priority,
            capacity,
            threads: Vec::new(),
        };
        if let Capacity::Fixed(limit) = capacity {
            for _ in 0..limit.div_ceil(Badge::BITS as usize) {
                server.grow()?;
            }
        }
        Ok(server)
    }

    fn grow(&mut self) -> IrqServerResult<()> {
        let index = self.threads.len();
        let thread = IrqServerThread::spawn(
            Arc::clone(&self.ops),
            index,
            Badge::MAX,
            DispatchMode::Forward {
                endpoint: self.endpoint,
                label: self.label,
            },
            self.priority,
        )?;
        self.threads.push(thread);
        log::debug!("interrupt server running {} worker(s)", self.threads.len());
        Ok(())
    }

    /// Register a callback for a line somewhere in the server.
    ///
    /// The line lands on the first thread with a free badge bit. Returns
    /// the badge assigned within that thread's node.
    pub fn register(&mut self, line: IrqLine, callback: IrqCallback<K>) -> IrqServerResult<Badge> {
        if self.has_line(line) {
            return Err(IrqServerError::AlreadyRegistered);
        }
        if let Capacity::Fixed(limit) = self.capacity {
            if self.registered_lines() >= limit {
                return Err(IrqServerError::ServerFull);
            }
        }
        if let Some(thread) = self.threads.iter().find(|thread| !thread.is_full()) {
            return thread.register(line, callback);
        }
        match self.capacity {
            Capacity::Dynamic => {
                self.grow()?;
                match self.threads.last() {
                    Some(thread) => thread.register(line, callback),
                    None => Err(IrqServerError::ServerFull),
                }
            }
            Capacity::Fixed(_) => Err(IrqServerError::ServerFull),
        }
    }

    /// Remove a line wherever it is registered.
    pub fn unregister(&mut self, line: IrqLine) -> IrqServerResult<()> {
        let thread = self
            .threads
            .iter()
            .find(|thread| thread.has_line(line))
            .ok_or(IrqServerError::NotRegistered)?;
        thread.unregister(line)
    }

    /// Dispatch a forwarded interrupt message.
    ///
    /// The message registers carry `[thread index, badge word, 0]`; the
    /// word is serviced on the named thread's node. Returns the number of
    /// callbacks run.
    pub fn handle_irq_ipc(&self, delivery: &Delivery) -> IrqServerResult<u32> {
        let index = delivery.message.regs[0] as usize;
        let word = Badge::new(delivery.message.regs[1]);
        let thread = self
            .threads
            .get(index)
            .ok_or(IrqServerError::UnknownThread)?;
        Ok(thread.node().lock().service(word))
    }

    /// Block on the endpoint and sort out what arrives.
    ///
    /// Interrupt messages are handled internally; anything under another
    /// label comes back as [`WaitOutcome::Foreign`] for the caller.
    pub fn wait_for_irq(&self) -> IrqServerResult<WaitOutcome> {
        let delivery = self.ops.recv(self.endpoint)?;
        if delivery.message.label == self.label {
            Ok(WaitOutcome::Handled(self.handle_irq_ipc(&delivery)?))
        } else {
            Ok(WaitOutcome::Foreign(delivery))
        }
    }

    /// Check whether any thread holds this line.
    #[must_use]
    pub fn has_line(&self, line: IrqLine) -> bool {
        self.threads.iter().any(|thread| thread.has_line(line))
    }

    /// Number of worker threads currently running.
    #[inline]
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Total lines registered across all threads.
    #[must_use]
    pub fn registered_lines(&self) -> usize {
        self.threads.iter().map(|thread| thread.line_count()).sum()
    }

    /// The endpoint workers forward to.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> CPtr<Endpoint> {
        self.endpoint
    }

    /// The label marking forwarded interrupt messages.
    #[inline]
    #[must_use]
    pub fn label(&self) -> u64 {
        self.label
    }

    /// The capacity policy this server was created with.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockKernel;

    use alloc::boxed::Box;
    use core::sync::atomic::{AtomicU32, Ordering};

    use k2_syscall::IpcMessage;

    const LABEL: u64 = 0x1234;

    fn server_with(ops: &Arc<MockKernel>, capacity: Capacity) -> IrqServer<MockKernel> {
        let endpoint = ops.create_endpoint().unwrap();
        IrqServer::new(Arc::clone(ops), endpoint, LABEL, 200, capacity).unwrap()
    }

    #[test]
    fn test_fixed_prespawns_workers() {
        let ops = Arc::new(MockKernel::new());
        assert_eq!(server_with(&ops, Capacity::Fixed(64)).thread_count(), 1);
        assert_eq!(server_with(&ops, Capacity::Fixed(65)).thread_count(), 2);
        assert_eq!(server_with(&ops, Capacity::Fixed(0)).thread_count(), 0);
    }

    #[test]
    fn test_dynamic_starts_empty() {
        let ops = Arc::new(MockKernel::new());
        let server = server_with(&ops, Capacity::Dynamic);
        assert_eq!(server.thread_count(), 0);
        assert_eq!(server.registered_lines(), 0);
    }

    #[test]
    fn test_fixed_zero_accepts_nothing() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Fixed(0));
        let err = server.register(5, Box::new(|_| {})).unwrap_err();
        assert_eq!(err, IrqServerError::ServerFull);
    }

    #[test]
    fn test_fixed_limit_enforced_below_node_capacity() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Fixed(2));
        server.register(10, Box::new(|_| {})).unwrap();
        server.register(11, Box::new(|_| {})).unwrap();
        // The single node still has 62 free bits, but the server is capped.
        let err = server.register(12, Box::new(|_| {})).unwrap_err();
        assert_eq!(err, IrqServerError::ServerFull);
        assert_eq!(server.thread_count(), 1);
    }

    #[test]
    fn test_dynamic_grows_when_thread_fills() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Dynamic);
        for line in 0..64 {
            server.register(line, Box::new(|_| {})).unwrap();
        }
        assert_eq!(server.thread_count(), 1);
        server.register(64, Box::new(|_| {})).unwrap();
        assert_eq!(server.thread_count(), 2);
        assert_eq!(server.registered_lines(), 65);
    }

    #[test]
    fn test_register_duplicate_across_threads() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Dynamic);
        server.register(30, Box::new(|_| {})).unwrap();
        let err = server.register(30, Box::new(|_| {})).unwrap_err();
        assert_eq!(err, IrqServerError::AlreadyRegistered);
    }

    #[test]
    fn test_register_reuses_freed_slot_on_first_thread() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Dynamic);
        for line in 0..65 {
            server.register(line, Box::new(|_| {})).unwrap();
        }
        server.unregister(3).unwrap();
        // Thread 0 has room again, so the new line lands there.
        let badge = server.register(100, Box::new(|_| {})).unwrap();
        assert_eq!(badge, Badge::bit(3));
        assert_eq!(server.thread_count(), 2);
    }

    #[test]
    fn test_unregister_unknown_line() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Dynamic);
        let err = server.unregister(77).unwrap_err();
        assert_eq!(err, IrqServerError::NotRegistered);
    }

    #[test]
    fn test_handle_irq_ipc_dispatches() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Fixed(4));
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let badge = server
            .register(
                40,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let delivery = Delivery::new(
            Badge::NONE,
            IpcMessage::new(LABEL, [0, badge.value(), 0]),
        );
        assert_eq!(server.handle_irq_ipc(&delivery).unwrap(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_irq_ipc_unknown_thread() {
        let ops = Arc::new(MockKernel::new());
        let server = server_with(&ops, Capacity::Fixed(1));
        let delivery = Delivery::new(Badge::NONE, IpcMessage::new(LABEL, [9, 1, 0]));
        let err = server.handle_irq_ipc(&delivery).unwrap_err();
        assert_eq!(err, IrqServerError::UnknownThread);
    }

    #[test]
    fn test_wait_for_irq_handles_own_label() {
        let ops = Arc::new(MockKernel::new());
        let mut server = server_with(&ops, Capacity::Fixed(4));
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let badge = server
            .register(
                41,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        ops.queue_recv(Delivery::new(
            Badge::NONE,
            IpcMessage::new(LABEL, [0, badge.value(), 0]),
        ));
        match server.wait_for_irq().unwrap() {
            WaitOutcome::Handled(count) => assert_eq!(count, 1),
            WaitOutcome::Foreign(_) => panic!("interrupt message came back as foreign"),
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_for_irq_returns_foreign_ipc() {
        let ops = Arc::new(MockKernel::new());
        let server = server_with(&ops, Capacity::Fixed(1));
        ops.queue_recv(Delivery::new(
            Badge::new(0x7),
            IpcMessage::new(0xBEEF, [1, 2, 3]),
        ));
        match server.wait_for_irq().unwrap() {
            WaitOutcome::Handled(_) => panic!("foreign message was swallowed"),
            WaitOutcome::Foreign(delivery) => {
                assert_eq!(delivery.message.label, 0xBEEF);
                assert_eq!(delivery.badge, Badge::new(0x7));
                assert_eq!(delivery.message.regs, [1, 2, 3]);
            }
        }
    }
}
