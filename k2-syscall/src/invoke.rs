//! Syscall invocation for userspace
//!
//! Inline-assembly bindings for the K2 syscall ABI, plus [`SysKernel`], the
//! syscall-backed [`KernelOps`] implementation. Only built with the
//! `userspace` feature on aarch64; everything else in the crate is
//! host-testable.
//!
//! # ABI
//!
//! - x7: syscall number
//! - x0-x5: arguments (x0 = capability being invoked)
//! - x0: return value, negative = error
//! - receive paths: payload in x1-x3, sender badge in x6

use alloc::boxed::Box;
use core::sync::atomic::{AtomicU64, Ordering};

use k2_cap::objects::{Endpoint, IrqHandler, Notification, Tcb};
use k2_cap::{Badge, CPtr, CapRights, IrqLine, MAX_IRQ_LINE, ObjectKind, RawCPtr};

use crate::error::{SyscallError, SyscallResult, check_result};
use crate::message::{Delivery, IpcMessage, MSG_REGS};
use crate::numbers::Syscall;
use crate::ops::KernelOps;

/// Raw syscall with 0 arguments.
#[inline]
pub fn syscall0(num: Syscall) -> i64 {
    let ret: i64;
    // SAFETY: svc traps to the kernel; no userspace memory is touched.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") num as u64,
            lateout("x0") ret,
            options(nostack)
        );
    }
    ret
}

/// Raw syscall with 1 argument.
#[inline]
pub fn syscall1(num: Syscall, arg0: u64) -> i64 {
    let ret: i64;
    // SAFETY: svc traps to the kernel. x0 carries the argument in and the
    // result out.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") num as u64,
            inlateout("x0") arg0 as i64 => ret,
            options(nostack)
        );
    }
    ret
}

/// Raw syscall with 2 arguments.
#[inline]
pub fn syscall2(num: Syscall, arg0: u64, arg1: u64) -> i64 {
    let ret: i64;
    // SAFETY: svc traps to the kernel.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") num as u64,
            inlateout("x0") arg0 as i64 => ret,
            in("x1") arg1,
            options(nostack)
        );
    }
    ret
}

/// Raw syscall with 3 arguments.
#[inline]
pub fn syscall3(num: Syscall, arg0: u64, arg1: u64, arg2: u64) -> i64 {
    let ret: i64;
    // SAFETY: svc traps to the kernel.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") num as u64,
            inlateout("x0") arg0 as i64 => ret,
            in("x1") arg1,
            in("x2") arg2,
            options(nostack)
        );
    }
    ret
}

/// Raw syscall with 4 arguments.
#[inline]
pub fn syscall4(num: Syscall, arg0: u64, arg1: u64, arg2: u64, arg3: u64) -> i64 {
    let ret: i64;
    // SAFETY: svc traps to the kernel.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") num as u64,
            inlateout("x0") arg0 as i64 => ret,
            in("x1") arg1,
            in("x2") arg2,
            in("x3") arg3,
            options(nostack)
        );
    }
    ret
}

/// Raw syscall with 5 arguments.
#[inline]
pub fn syscall5(num: Syscall, arg0: u64, arg1: u64, arg2: u64, arg3: u64, arg4: u64) -> i64 {
    let ret: i64;
    // SAFETY: svc traps to the kernel.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") num as u64,
            inlateout("x0") arg0 as i64 => ret,
            in("x1") arg1,
            in("x2") arg2,
            in("x3") arg3,
            in("x4") arg4,
            options(nostack)
        );
    }
    ret
}

/// Raw syscall with 6 arguments.
#[inline]
pub fn syscall6(
    num: Syscall,
    arg0: u64,
    arg1: u64,
    arg2: u64,
    arg3: u64,
    arg4: u64,
    arg5: u64,
) -> i64 {
    let ret: i64;
    // SAFETY: svc traps to the kernel.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") num as u64,
            inlateout("x0") arg0 as i64 => ret,
            in("x1") arg1,
            in("x2") arg2,
            in("x3") arg3,
            in("x4") arg4,
            in("x5") arg5,
            options(nostack)
        );
    }
    ret
}

// === IPC ===

/// Send a message to an endpoint, blocking until a receiver takes it.
#[inline]
pub fn send(dest: u64, label: u64, regs: [u64; MSG_REGS]) -> SyscallResult {
    check_result(syscall5(
        Syscall::Send,
        dest,
        label,
        regs[0],
        regs[1],
        regs[2],
    ))
}

/// Receive a message from an endpoint, blocking until one arrives.
///
/// On success x0 carries the label, x1-x3 the data words, and x6 the
/// sender's badge.
#[inline]
pub fn recv(src: u64) -> Result<Delivery, SyscallError> {
    let x0: i64;
    let x1: u64;
    let x2: u64;
    let x3: u64;
    let badge: u64;
    // SAFETY: svc traps to the kernel; all delivery registers are captured.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") Syscall::Recv as u64,
            inlateout("x0") src as i64 => x0,
            lateout("x1") x1,
            lateout("x2") x2,
            lateout("x3") x3,
            lateout("x6") badge,
            options(nostack)
        );
    }
    if x0 < 0 {
        Err(SyscallError::from_i64(x0).unwrap_or(SyscallError::InvalidSyscall))
    } else {
        Ok(Delivery {
            badge: Badge::new(badge),
            message: IpcMessage {
                label: x0 as u64,
                regs: [x1, x2, x3],
            },
        })
    }
}

// === Notifications ===

/// Signal a notification, ORing the capability's badge into its word.
#[inline]
pub fn signal(dest: u64) -> SyscallResult {
    check_result(syscall1(Syscall::Signal, dest))
}

/// Wait on a notification; blocks until signalled.
///
/// The accumulated badge word comes back in x1 so the full 64-bit range is
/// usable; x0 only carries the status.
#[inline]
pub fn wait(src: u64) -> Result<u64, SyscallError> {
    let x0: i64;
    let word: u64;
    // SAFETY: svc traps to the kernel; badge word captured from x1.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") Syscall::Wait as u64,
            inlateout("x0") src as i64 => x0,
            lateout("x1") word,
            options(nostack)
        );
    }
    if x0 < 0 {
        Err(SyscallError::from_i64(x0).unwrap_or(SyscallError::InvalidSyscall))
    } else {
        Ok(word)
    }
}

/// Poll a notification; like [`wait`] but returns an empty word instead of
/// blocking.
#[inline]
pub fn poll(src: u64) -> Result<u64, SyscallError> {
    let x0: i64;
    let word: u64;
    // SAFETY: svc traps to the kernel; badge word captured from x1.
    unsafe {
        core::arch::asm!(
            "svc #0",
            in("x7") Syscall::Poll as u64,
            inlateout("x0") src as i64 => x0,
            lateout("x1") word,
            options(nostack)
        );
    }
    if x0 < 0 {
        Err(SyscallError::from_i64(x0).unwrap_or(SyscallError::InvalidSyscall))
    } else {
        Ok(word)
    }
}

// === Capability management ===

/// Delete the capability at `index` in `cnode`, leaving the slot empty.
#[inline]
pub fn cap_delete(cnode: u64, index: u64, depth: u64) -> SyscallResult {
    check_result(syscall3(Syscall::CapDelete, cnode, index, depth))
}

// === Memory ===

/// Retype untyped memory into `count` objects of the given kind, placing
/// the new capabilities at consecutive slots starting at `dest_index`.
#[inline]
pub fn retype(
    untyped: u64,
    kind: ObjectKind,
    size_bits: u64,
    dest_cnode: u64,
    dest_index: u64,
    count: u64,
) -> SyscallResult {
    check_result(syscall6(
        Syscall::Retype,
        untyped,
        kind.as_u64(),
        size_bits,
        dest_cnode,
        dest_index,
        count,
    ))
}

/// Map a frame at `vaddr` with the given rights (attr 0 = normal memory,
/// 1 = device).
#[inline]
pub fn map_frame(vspace: u64, frame: u64, vaddr: u64, rights: u64, attr: u64) -> SyscallResult {
    check_result(syscall5(
        Syscall::MapFrame,
        vspace,
        frame,
        vaddr,
        rights,
        attr,
    ))
}

/// Unmap a frame from wherever it is mapped.
#[inline]
pub fn unmap_frame(frame: u64) -> SyscallResult {
    check_result(syscall1(Syscall::UnmapFrame, frame))
}

// === Threads ===

/// Bind a TCB to its capability space and address space.
///
/// The fault endpoint and IPC buffer are optional (0 = none); the TCB must
/// be inactive.
#[inline]
pub fn tcb_configure(
    tcb: u64,
    fault_ep: u64,
    cspace: u64,
    vspace: u64,
    ipc_buf_addr: u64,
    ipc_buf_frame: u64,
) -> SyscallResult {
    check_result(syscall6(
        Syscall::TcbConfigure,
        tcb,
        fault_ep,
        cspace,
        vspace,
        ipc_buf_addr,
        ipc_buf_frame,
    ))
}

/// Set a TCB's initial register state: entry point, stack pointer, and
/// first argument.
#[inline]
pub fn tcb_write_registers(tcb: u64, pc: u64, sp: u64, arg0: u64) -> SyscallResult {
    // Kernel-side register file layout: [x0..x30, sp, pc, spsr].
    let mut regs = [0u64; 34];
    regs[0] = arg0;
    regs[31] = sp;
    regs[32] = pc;
    regs[33] = 0; // SPSR: EL0, AArch64

    check_result(syscall5(
        Syscall::TcbWriteRegisters,
        tcb,
        0, // resume flag
        0, // arch flags, reserved
        34,
        regs.as_ptr() as u64,
    ))
}

/// Make a TCB runnable.
#[inline]
pub fn tcb_resume(tcb: u64) -> SyscallResult {
    check_result(syscall1(Syscall::TcbResume, tcb))
}

/// Set a TCB's scheduling priority.
#[inline]
pub fn tcb_set_priority(tcb: u64, priority: u8) -> SyscallResult {
    check_result(syscall2(Syscall::TcbSetPriority, tcb, priority as u64))
}

/// Terminate the calling thread. Never returns.
#[inline]
pub fn tcb_exit(code: i32) -> ! {
    syscall1(Syscall::TcbExit, code as u64);
    // Unreachable unless the kernel refused the exit; park the thread.
    loop {
        sched_yield();
    }
}

/// Yield the remainder of the time slice.
#[inline]
pub fn sched_yield() {
    syscall0(Syscall::Yield);
}

// === Debug ===

/// Write one character to the kernel debug console.
#[inline]
pub fn debug_putc(c: u8) {
    syscall1(Syscall::DebugPutChar, c as u64);
}

/// Write a string to the kernel debug console in one syscall.
#[inline]
pub fn debug_puts(s: &str) {
    syscall2(Syscall::DebugPuts, s.as_ptr() as u64, s.len() as u64);
}

// === Root task environment ===

/// Where the root task's well-known capabilities live.
///
/// The kernel hands the initial task a single-level capability node with a
/// fixed set of seeded slots; everything after `first_free_slot` is empty.
#[derive(Clone, Copy, Debug)]
pub struct CspaceLayout {
    /// log2 slot count of the root capability node.
    pub cnode_radix: u8,
    /// Slot of the root capability node's own capability.
    pub root_cnode_slot: u64,
    /// Slot of the task's address space root.
    pub vspace_slot: u64,
    /// Slot of the initial untyped memory capability.
    pub untyped_slot: u64,
    /// Slot of the IRQ control capability.
    pub irq_control_slot: u64,
    /// First slot the task may allocate from.
    pub first_free_slot: u64,
}

impl CspaceLayout {
    /// The layout the kernel seeds for the initial task.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            cnode_radix: 10,
            root_cnode_slot: 0,
            vspace_slot: 2,
            untyped_slot: 9,
            irq_control_slot: 14,
            first_free_slot: 256,
        }
    }

    /// Encode a slot index as a CPtr value for this layout.
    #[inline]
    #[must_use]
    pub const fn cptr(&self, slot: u64) -> u64 {
        slot << (64 - self.cnode_radix)
    }
}

impl Default for CspaceLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// Default thread stack size.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

const PAGE_SIZE: usize = 4096;

/// Base of the region thread stacks are carved from.
const STACK_REGION_BASE: u64 = 0x0000_1000_0000_0000;

/// Syscall-backed [`KernelOps`] for the root task.
///
/// Owns two bump allocators: capability slots (from the layout's first free
/// slot) and stack addresses. Neither recycles; deleted slots stay retired.
pub struct SysKernel {
    layout: CspaceLayout,
    next_slot: AtomicU64,
    next_stack: AtomicU64,
}

impl SysKernel {
    /// Create a kernel handle over the given root-task layout.
    #[must_use]
    pub const fn new(layout: CspaceLayout) -> Self {
        Self {
            next_slot: AtomicU64::new(layout.first_free_slot),
            next_stack: AtomicU64::new(STACK_REGION_BASE),
            layout,
        }
    }

    /// Create a kernel handle over the standard layout.
    #[must_use]
    pub const fn standard() -> Self {
        Self::new(CspaceLayout::standard())
    }

    fn alloc_slots(&self, count: u64) -> u64 {
        self.next_slot.fetch_add(count, Ordering::SeqCst)
    }

    fn root_cnode(&self) -> u64 {
        self.layout.cptr(self.layout.root_cnode_slot)
    }

    fn untyped(&self) -> u64 {
        self.layout.cptr(self.layout.untyped_slot)
    }

    /// Retype one object of `kind` into a freshly allocated slot.
    fn create_object(&self, kind: ObjectKind) -> SyscallResult<u64> {
        let slot = self.alloc_slots(1);
        retype(self.untyped(), kind, 0, self.root_cnode(), slot, 1)?;
        Ok(slot)
    }

    fn start_tcb(&self, tcb: u64, pc: u64, sp: u64, arg0: u64, priority: u8) -> SyscallResult<()> {
        tcb_configure(
            tcb,
            0,
            self.root_cnode(),
            self.layout.cptr(self.layout.vspace_slot),
            0,
            0,
        )?;
        tcb_set_priority(tcb, priority)?;
        tcb_write_registers(tcb, pc, sp, arg0)?;
        tcb_resume(tcb)?;
        Ok(())
    }
}

impl Default for SysKernel {
    fn default() -> Self {
        Self::standard()
    }
}

impl KernelOps for SysKernel {
    fn create_notification(&self) -> SyscallResult<CPtr<Notification>> {
        let slot = self.create_object(ObjectKind::Notification)?;
        Ok(CPtr::from_index(slot, self.layout.cnode_radix))
    }

    fn create_endpoint(&self) -> SyscallResult<CPtr<Endpoint>> {
        let slot = self.create_object(ObjectKind::Endpoint)?;
        Ok(CPtr::from_index(slot, self.layout.cnode_radix))
    }

    fn create_irq_handler(&self, line: IrqLine) -> SyscallResult<CPtr<IrqHandler>> {
        if line > MAX_IRQ_LINE {
            return Err(SyscallError::InvalidArg);
        }
        let slot = self.alloc_slots(1);
        irq_control_get(
            self.layout.cptr(self.layout.irq_control_slot),
            line,
            self.root_cnode(),
            slot,
            0,
        )?;
        Ok(CPtr::from_index(slot, self.layout.cnode_radix))
    }

    fn bind_irq(
        &self,
        handler: CPtr<IrqHandler>,
        notification: CPtr<Notification>,
        badge: Badge,
    ) -> SyscallResult<()> {
        irq_set_handler(handler.raw(), notification.raw(), badge.value()).map(|_| ())
    }

    fn ack_irq(&self, handler: CPtr<IrqHandler>) -> SyscallResult<()> {
        irq_ack(handler.raw()).map(|_| ())
    }

    fn clear_irq(&self, handler: CPtr<IrqHandler>) -> SyscallResult<()> {
        irq_clear_handler(handler.raw()).map(|_| ())
    }

    fn delete_cap(&self, slot: RawCPtr) -> SyscallResult<()> {
        cap_delete(
            self.root_cnode(),
            slot.slot(self.layout.cnode_radix),
            0,
        )
        .map(|_| ())
    }

    fn wait(&self, notification: CPtr<Notification>) -> SyscallResult<Badge> {
        wait(notification.raw()).map(Badge::new)
    }

    fn poll(&self, notification: CPtr<Notification>) -> SyscallResult<Badge> {
        poll(notification.raw()).map(Badge::new)
    }

    fn signal(&self, notification: CPtr<Notification>) -> SyscallResult<()> {
        signal(notification.raw()).map(|_| ())
    }

    fn send(&self, endpoint: CPtr<Endpoint>, message: IpcMessage) -> SyscallResult<()> {
        send(endpoint.raw(), message.label, message.regs).map(|_| ())
    }

    fn recv(&self, endpoint: CPtr<Endpoint>) -> SyscallResult<Delivery> {
        recv(endpoint.raw())
    }

    fn spawn_thread(
        &self,
        name: &'static str,
        priority: u8,
        entry: Box<dyn FnOnce() + Send>,
    ) -> SyscallResult<CPtr<Tcb>> {
        let stack_pages = DEFAULT_STACK_SIZE / PAGE_SIZE;

        // One slot for the TCB, then the stack frames.
        let tcb_slot = self.alloc_slots(1 + stack_pages as u64);
        let frame_base_slot = tcb_slot + 1;

        retype(self.untyped(), ObjectKind::Tcb, 0, self.root_cnode(), tcb_slot, 1)?;
        retype(
            self.untyped(),
            ObjectKind::Frame,
            0,
            self.root_cnode(),
            frame_base_slot,
            stack_pages as u64,
        )?;

        // Reserve the stack plus one unmapped guard page below it.
        let region = (DEFAULT_STACK_SIZE + PAGE_SIZE) as u64;
        let stack_lowest = self.next_stack.fetch_add(region, Ordering::SeqCst) + PAGE_SIZE as u64;

        let vspace = self.layout.cptr(self.layout.vspace_slot);
        for page in 0..stack_pages {
            let frame = self.layout.cptr(frame_base_slot + page as u64);
            let vaddr = stack_lowest + (page * PAGE_SIZE) as u64;
            map_frame(vspace, frame, vaddr, CapRights::RW.bits() as u64, 0)?;
        }
        let stack_top = stack_lowest + DEFAULT_STACK_SIZE as u64;

        let tcb = self.layout.cptr(tcb_slot);
        let pc = k2_thread_entry as *const () as u64;

        // Double-boxed so a thin pointer survives the register hand-off.
        let wrapper: Box<Box<dyn FnOnce() + Send>> = Box::new(entry);
        let wrapper_ptr = Box::into_raw(wrapper);

        if let Err(err) = self.start_tcb(tcb, pc, stack_top, wrapper_ptr as u64, priority) {
            // SAFETY: the thread never started, so the pointer is still
            // uniquely ours; reclaim the closure instead of leaking it.
            drop(unsafe { Box::from_raw(wrapper_ptr) });
            return Err(err);
        }

        log::trace!("spawned thread '{}' at priority {}", name, priority);
        Ok(CPtr::from_index(tcb_slot, self.layout.cnode_radix))
    }

    fn debug_putchar(&self, byte: u8) -> SyscallResult<()> {
        debug_putc(byte);
        Ok(())
    }
}

/// Entry point every spawned thread starts at.
///
/// x0 carries the double-boxed closure from
/// [`KernelOps::spawn_thread`]; the thread runs it and exits.
#[unsafe(no_mangle)]
extern "C" fn k2_thread_entry(closure_ptr: u64) -> ! {
    // SAFETY: the pointer was produced by Box::into_raw in spawn_thread and
    // ownership passes to this thread exactly once.
    let closure = unsafe { Box::from_raw(closure_ptr as *mut Box<dyn FnOnce() + Send>) };
    closure();
    tcb_exit(0)
}

// === IRQ ===

/// Mint an IRQ handler capability for `irq`, placing it at `dest_index` in
/// `dest_cnode`.
#[inline]
pub fn irq_control_get(
    irq_control: u64,
    irq: u32,
    dest_cnode: u64,
    dest_index: u64,
    depth: u64,
) -> SyscallResult {
    check_result(syscall5(
        Syscall::IrqControlGet,
        irq_control,
        irq as u64,
        dest_cnode,
        dest_index,
        depth,
    ))
}

/// Bind an IRQ handler to a notification.
///
/// When the line fires the kernel signals the notification with `badge`
/// and masks the line until [`irq_ack`].
#[inline]
pub fn irq_set_handler(irq_handler: u64, notification: u64, badge: u64) -> SyscallResult {
    check_result(syscall3(
        Syscall::IrqSetHandler,
        irq_handler,
        notification,
        badge,
    ))
}

/// Acknowledge an interrupt, unmasking its line.
#[inline]
pub fn irq_ack(irq_handler: u64) -> SyscallResult {
    check_result(syscall1(Syscall::IrqAck, irq_handler))
}

/// Clear an IRQ handler's notification binding; the line stops delivering.
#[inline]
pub fn irq_clear_handler(irq_handler: u64) -> SyscallResult {
    check_result(syscall1(Syscall::IrqClearHandler, irq_handler))
}
