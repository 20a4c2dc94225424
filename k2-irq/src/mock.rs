//! Scripted kernel for exercising the interrupt server off target.
//!
//! Every operation records what it was asked, and waits/receives replay
//! words queued by the test. An unscripted wait fails with `WouldBlock`,
//! which doubles as the stop signal for worker loops driven synchronously
//! in tests.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use k2_cap::objects::{Endpoint, IrqHandler, Notification, Tcb};
use k2_cap::{Badge, CPtr, IrqLine, RawCPtr};
use k2_syscall::{Delivery, IpcMessage, KernelOps, SyscallError, SyscallResult};
use spin::mutex::SpinMutex;

const MOCK_RADIX: u8 = 10;

struct MockState {
    next_slot: u64,
    /// Handler capabilities minted, with their lines.
    handlers: Vec<(u64, IrqLine)>,
    /// (handler, notification, badge) triples seen by `bind_irq`.
    bindings: Vec<(u64, u64, u64)>,
    acks: Vec<u64>,
    cleared: Vec<u64>,
    deleted: Vec<u64>,
    /// Badge words queued per notification.
    wait_words: BTreeMap<u64, VecDeque<u64>>,
    recv_queue: VecDeque<Delivery>,
    sent: Vec<(u64, IpcMessage)>,
    spawned: Vec<(&'static str, u8)>,
    entries: VecDeque<Box<dyn FnOnce() + Send>>,
    fail_next_bind: bool,
}

pub struct MockKernel {
    state: SpinMutex<MockState>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            state: SpinMutex::new(MockState {
                next_slot: 0x100,
                handlers: Vec::new(),
                bindings: Vec::new(),
                acks: Vec::new(),
                cleared: Vec::new(),
                deleted: Vec::new(),
                wait_words: BTreeMap::new(),
                recv_queue: VecDeque::new(),
                sent: Vec::new(),
                spawned: Vec::new(),
                entries: VecDeque::new(),
                fail_next_bind: false,
            }),
        }
    }

    fn alloc_cptr(state: &mut MockState) -> u64 {
        let slot = state.next_slot;
        state.next_slot += 1;
        RawCPtr::from_index(slot, MOCK_RADIX).raw()
    }

    /// Queue a badge word for the next wait/poll on `notification`.
    pub fn script_wait(&self, notification: CPtr<Notification>, word: Badge) {
        self.state
            .lock()
            .wait_words
            .entry(notification.raw())
            .or_default()
            .push_back(word.value());
    }

    /// Queue a delivery for the next `recv`.
    pub fn queue_recv(&self, delivery: Delivery) {
        self.state.lock().recv_queue.push_back(delivery);
    }

    /// Make the next `bind_irq` fail.
    pub fn fail_next_bind(&self) {
        self.state.lock().fail_next_bind = true;
    }

    /// The badge most recently bound for `line`, if any.
    pub fn binding_badge_for_line(&self, line: IrqLine) -> Option<u64> {
        let state = self.state.lock();
        let (handler, _) = state.handlers.iter().rev().find(|(_, l)| *l == line)?;
        state
            .bindings
            .iter()
            .rev()
            .find(|(h, _, _)| h == handler)
            .map(|(_, _, badge)| *badge)
    }

    pub fn ack_count(&self) -> usize {
        self.state.lock().acks.len()
    }

    pub fn cleared_count(&self) -> usize {
        self.state.lock().cleared.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.state.lock().deleted.len()
    }

    /// Everything sent over endpoints so far.
    pub fn sent(&self) -> Vec<(u64, IpcMessage)> {
        self.state.lock().sent.clone()
    }

    /// Names and priorities of spawned threads, in spawn order.
    pub fn spawned(&self) -> Vec<(&'static str, u8)> {
        self.state.lock().spawned.clone()
    }

    /// Take the oldest spawned entry closure so a test can run it inline.
    pub fn take_spawn_entry(&self) -> Option<Box<dyn FnOnce() + Send>> {
        self.state.lock().entries.pop_front()
    }
}

impl KernelOps for MockKernel {
    fn create_notification(&self) -> SyscallResult<CPtr<Notification>> {
        let mut state = self.state.lock();
        let raw = Self::alloc_cptr(&mut state);
        Ok(CPtr::from_raw(raw))
    }

    fn create_endpoint(&self) -> SyscallResult<CPtr<Endpoint>> {
        let mut state = self.state.lock();
        let raw = Self::alloc_cptr(&mut state);
        Ok(CPtr::from_raw(raw))
    }

    fn create_irq_handler(&self, line: IrqLine) -> SyscallResult<CPtr<IrqHandler>> {
        let mut state = self.state.lock();
        let raw = Self::alloc_cptr(&mut state);
        state.handlers.push((raw, line));
        Ok(CPtr::from_raw(raw))
    }

    fn bind_irq(
        &self,
        handler: CPtr<IrqHandler>,
        notification: CPtr<Notification>,
        badge: Badge,
    ) -> SyscallResult<()> {
        let mut state = self.state.lock();
        if state.fail_next_bind {
            state.fail_next_bind = false;
            return Err(SyscallError::InvalidCap);
        }
        state
            .bindings
            .push((handler.raw(), notification.raw(), badge.value()));
        Ok(())
    }

    fn ack_irq(&self, handler: CPtr<IrqHandler>) -> SyscallResult<()> {
        self.state.lock().acks.push(handler.raw());
        Ok(())
    }

    fn clear_irq(&self, handler: CPtr<IrqHandler>) -> SyscallResult<()> {
        self.state.lock().cleared.push(handler.raw());
        Ok(())
    }

    fn delete_cap(&self, slot: RawCPtr) -> SyscallResult<()> {
        self.state.lock().deleted.push(slot.raw());
        Ok(())
    }

    fn wait(&self, notification: CPtr<Notification>) -> SyscallResult<Badge> {
        let mut state = self.state.lock();
        state
            .wait_words
            .get_mut(&notification.raw())
            .and_then(VecDeque::pop_front)
            .map(Badge::new)
            .ok_or(SyscallError::WouldBlock)
    }

    fn poll(&self, notification: CPtr<Notification>) -> SyscallResult<Badge> {
        let mut state = self.state.lock();
        let word = state
            .wait_words
            .get_mut(&notification.raw())
            .and_then(VecDeque::pop_front)
            .unwrap_or(0);
        Ok(Badge::new(word))
    }

    fn signal(&self, _notification: CPtr<Notification>) -> SyscallResult<()> {
        Ok(())
    }

    fn send(&self, endpoint: CPtr<Endpoint>, message: IpcMessage) -> SyscallResult<()> {
        self.state.lock().sent.push((endpoint.raw(), message));
        Ok(())
    }

    fn recv(&self, _endpoint: CPtr<Endpoint>) -> SyscallResult<Delivery> {
        self.state
            .lock()
            .recv_queue
            .pop_front()
            .ok_or(SyscallError::WouldBlock)
    }

    fn spawn_thread(
        &self,
        name: &'static str,
        priority: u8,
        entry: Box<dyn FnOnce() + Send>,
    ) -> SyscallResult<CPtr<Tcb>> {
        let mut state = self.state.lock();
        let index = state.spawned.len() as u64;
        state.spawned.push((name, priority));
        state.entries.push_back(entry);
        Ok(CPtr::from_index(0x200 + index, MOCK_RADIX))
    }

    fn debug_putchar(&self, _byte: u8) -> SyscallResult<()> {
        Ok(())
    }
}
