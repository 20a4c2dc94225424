//! Debug console bring-up
//!
//! The console is a process-wide singleton over a pluggable [`CharDevice`].
//! Bring-up walks a small state machine: a regular setup installs a real
//! driver, a failsafe setup falls back to the kernel's debug character
//! syscall, and output on a console that was never set up promotes the
//! failsafe lazily so early logging is never lost. A setup that started
//! but never finished leaves the console in a sticky in-progress state;
//! re-running setup over a half-initialised device is refused.
//!
//! Setup transitions are logged, and the logger writes back through this
//! console. Events are therefore collected under the lock but reported
//! only after it is released; see [`report`].

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use k2_syscall::{KernelOps, SyscallError};
use spin::mutex::SpinMutex;

/// Where the console is in its bring-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupState {
    /// No setup has run.
    NotInitialised,
    /// A regular setup started and has not completed.
    RegularSetup,
    /// A failsafe setup started and has not completed.
    FailsafeSetup,
    /// A device is installed and output flows.
    Complete,
}

/// Byte-level seam between the console and whatever drives the wire.
pub trait CharDevice: Send {
    /// Emit one byte.
    fn put_byte(&mut self, byte: u8);
    /// Fetch one byte if the device has one pending.
    fn get_byte(&mut self) -> Option<u8>;
}

/// Console bring-up failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    /// An earlier setup started but never finished; the console cannot be
    /// brought up again without a [`reset`].
    SetupInProgress,
    /// Failsafe bring-up was requested but no failsafe device is installed.
    NoFailsafe,
    /// A kernel invocation failed during bring-up.
    Syscall(SyscallError),
}

impl ConsoleError {
    /// Static description of the error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SetupInProgress => "console setup already in progress",
            Self::NoFailsafe => "no failsafe console device installed",
            Self::Syscall(_) => "kernel invocation failed during console setup",
        }
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syscall(err) => write!(f, "console setup failed: {}", err),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<SyscallError> for ConsoleError {
    fn from(err: SyscallError) -> Self {
        Self::Syscall(err)
    }
}

/// A bring-up transition worth logging, carried out of the lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SetupEvent {
    None,
    FailsafeFromIdle,
    FailsafeAfterFailure,
    Stuck,
}

struct Console {
    state: SetupState,
    device: Option<Box<dyn CharDevice>>,
    failsafe: Option<Box<dyn CharDevice>>,
    stuck_reported: bool,
}

impl Console {
    const fn new() -> Self {
        Self {
            state: SetupState::NotInitialised,
            device: None,
            failsafe: None,
            stuck_reported: false,
        }
    }

    fn state(&self) -> SetupState {
        self.state
    }

    /// Start a regular setup. `Ok(false)` means the console is already
    /// complete and there is nothing to do.
    fn begin_regular(&mut self) -> Result<bool, ConsoleError> {
        match self.state {
            SetupState::Complete => Ok(false),
            SetupState::RegularSetup | SetupState::FailsafeSetup => {
                Err(ConsoleError::SetupInProgress)
            }
            SetupState::NotInitialised => {
                self.state = SetupState::RegularSetup;
                Ok(true)
            }
        }
    }

    fn install(&mut self, device: Box<dyn CharDevice>) {
        self.device = Some(device);
        self.state = SetupState::Complete;
    }

    fn install_failsafe(&mut self, device: Box<dyn CharDevice>) {
        self.failsafe = Some(device);
    }

    fn setup_failsafe(&mut self) -> Result<(), ConsoleError> {
        match self.state {
            SetupState::Complete => Ok(()),
            SetupState::FailsafeSetup => Err(ConsoleError::SetupInProgress),
            SetupState::NotInitialised | SetupState::RegularSetup => {
                self.state = SetupState::FailsafeSetup;
                match self.failsafe.take() {
                    Some(device) => {
                        self.install(device);
                        Ok(())
                    }
                    None => Err(ConsoleError::NoFailsafe),
                }
            }
        }
    }

    /// Lazy bring-up on first output. Promotes the failsafe if the console
    /// was never (or only partially) set up; returns what happened so the
    /// caller can log it outside the lock.
    fn ensure_ready(&mut self) -> SetupEvent {
        match self.state {
            SetupState::Complete => SetupEvent::None,
            SetupState::NotInitialised => match self.setup_failsafe() {
                Ok(()) => SetupEvent::FailsafeFromIdle,
                Err(_) => self.mark_stuck(),
            },
            SetupState::RegularSetup => match self.setup_failsafe() {
                Ok(()) => SetupEvent::FailsafeAfterFailure,
                Err(_) => self.mark_stuck(),
            },
            SetupState::FailsafeSetup => self.mark_stuck(),
        }
    }

    /// The stuck state is reported once; after that, output just drops.
    fn mark_stuck(&mut self) -> SetupEvent {
        if self.stuck_reported {
            SetupEvent::None
        } else {
            self.stuck_reported = true;
            SetupEvent::Stuck
        }
    }

    fn put_byte(&mut self, byte: u8) {
        if let Some(device) = self.device.as_mut() {
            device.put_byte(byte);
        }
    }

    fn get_byte(&mut self) -> Option<u8> {
        self.device.as_mut().and_then(|device| device.get_byte())
    }

    fn write_bytes(&mut self, s: &str) -> usize {
        let Some(device) = self.device.as_mut() else {
            return 0;
        };
        for byte in s.bytes() {
            if byte == b'\n' {
                device.put_byte(b'\r');
            }
            device.put_byte(byte);
        }
        s.len()
    }

    fn reset(&mut self) {
        self.device = None;
        self.state = SetupState::NotInitialised;
        self.stuck_reported = false;
    }
}

/// Global console instance.
static CONSOLE: SpinMutex<Console> = SpinMutex::new(Console::new());

fn report(event: SetupEvent) {
    match event {
        SetupEvent::None => {}
        SetupEvent::FailsafeFromIdle => {
            log::info!("no serial setup; using kernel character I/O");
        }
        SetupEvent::FailsafeAfterFailure => {
            log::warn!("serial setup failed part-way; continuing on the failsafe console");
        }
        SetupEvent::Stuck => {
            log::error!("no console device available; dropping output");
        }
    }
}

/// Bring the console up with a real device.
///
/// `init` builds the device; it runs without the console lock held, with
/// the in-progress state guarding against concurrent setups. Returns Ok
/// and does nothing if the console is already complete. A failed earlier
/// setup leaves the console refusing further regular setups until
/// [`reset`].
pub fn setup(
    init: impl FnOnce() -> Result<Box<dyn CharDevice>, SyscallError>,
) -> Result<(), ConsoleError> {
    if !CONSOLE.lock().begin_regular()? {
        return Ok(());
    }
    match init() {
        Ok(device) => {
            CONSOLE.lock().install(device);
            Ok(())
        }
        // The console stays in RegularSetup; first output promotes the
        // failsafe with a warning.
        Err(err) => Err(ConsoleError::Syscall(err)),
    }
}

/// Bring the console up on the installed failsafe device.
pub fn setup_failsafe() -> Result<(), ConsoleError> {
    CONSOLE.lock().setup_failsafe()
}

/// Register the device lazy bring-up falls back to.
pub fn install_failsafe(device: Box<dyn CharDevice>) {
    CONSOLE.lock().install_failsafe(device);
}

/// Write one byte, bringing the console up lazily if needed.
pub fn putchar(byte: u8) {
    let event = CONSOLE.lock().ensure_ready();
    report(event);
    CONSOLE.lock().put_byte(byte);
}

/// Read one byte if the device has one pending.
pub fn getchar() -> Option<u8> {
    let event = CONSOLE.lock().ensure_ready();
    report(event);
    CONSOLE.lock().get_byte()
}

/// Write a string with LF expanded to CRLF. Returns the number of input
/// bytes written; 0 when the console has no device.
pub fn write(s: &str) -> usize {
    let event = CONSOLE.lock().ensure_ready();
    report(event);
    CONSOLE.lock().write_bytes(s)
}

/// Drop the active device and return to [`SetupState::NotInitialised`].
///
/// The device's `Drop` releases whatever it holds. A fresh [`setup`] may
/// run afterwards.
pub fn reset() {
    CONSOLE.lock().reset();
}

/// Current bring-up state.
#[must_use]
pub fn setup_state() -> SetupState {
    CONSOLE.lock().state()
}

/// [`CharDevice`] backed by the kernel's debug character syscall.
///
/// The standard failsafe, and the whole console on boards with no driver.
/// The debug syscall is write-only, so reads always come back empty.
pub struct DebugConsole<K: KernelOps> {
    ops: Arc<K>,
}

impl<K: KernelOps> DebugConsole<K> {
    /// Create a debug console over a kernel handle.
    #[must_use]
    pub fn new(ops: Arc<K>) -> Self {
        Self { ops }
    }
}

impl<K: KernelOps> CharDevice for DebugConsole<K> {
    fn put_byte(&mut self, byte: u8) {
        let _ = self.ops.debug_putchar(byte);
    }

    fn get_byte(&mut self) -> Option<u8> {
        None
    }
}

/// Console writer for `fmt::Write`.
pub struct ConsoleWriter;

impl fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        write(s);
        Ok(())
    }
}

/// Print formatted output to the console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::console::ConsoleWriter, $($arg)*);
    }};
}

/// Print formatted output with a newline to the console.
#[macro_export]
macro_rules! println {
    () => {{
        let _ = $crate::console::write("\n");
    }};
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::console::ConsoleWriter, $($arg)*);
        let _ = $crate::console::write("\n");
    }};
}
