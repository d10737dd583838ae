//! Host callback bundle.
//!
//! Debuggers, movie recorders and scripting layers observe the core through
//! these hooks. They belong to one machine instance and are dropped with it.

/// Hook taking the accessed address.
pub type AddressHook = Box<dyn FnMut(u16)>;

/// Hook with no arguments.
pub type SignalHook = Box<dyn FnMut()>;

/// Callbacks supplied by the host at construction time.
#[derive(Default)]
pub struct CoreComm {
    /// Fired on every memory read, ROM included.
    pub on_read: Option<AddressHook>,
    /// Fired on every memory write, ROM included.
    pub on_write: Option<AddressHook>,
    /// Fired whenever the keyboard port is sampled.
    pub on_input_poll: Option<SignalHook>,
    /// Fired when the CPU acknowledges an interrupt.
    pub on_interrupt: Option<SignalHook>,
}

impl CoreComm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_hook(mut self, hook: impl FnMut(u16) + 'static) -> Self {
        self.on_read = Some(Box::new(hook));
        self
    }

    pub fn with_write_hook(mut self, hook: impl FnMut(u16) + 'static) -> Self {
        self.on_write = Some(Box::new(hook));
        self
    }

    pub fn with_input_poll_hook(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_input_poll = Some(Box::new(hook));
        self
    }

    pub fn with_interrupt_hook(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_interrupt = Some(Box::new(hook));
        self
    }

    pub(crate) fn call_read(&mut self, addr: u16) {
        if let Some(hook) = self.on_read.as_mut() {
            hook(addr);
        }
    }

    pub(crate) fn call_write(&mut self, addr: u16) {
        if let Some(hook) = self.on_write.as_mut() {
            hook(addr);
        }
    }

    pub(crate) fn call_input_poll(&mut self) {
        if let Some(hook) = self.on_input_poll.as_mut() {
            hook();
        }
    }

    pub(crate) fn call_interrupt(&mut self) {
        if let Some(hook) = self.on_interrupt.as_mut() {
            hook();
        }
    }
}

impl std::fmt::Debug for CoreComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreComm")
            .field("on_read", &self.on_read.is_some())
            .field("on_write", &self.on_write.is_some())
            .field("on_input_poll", &self.on_input_poll.is_some())
            .field("on_interrupt", &self.on_interrupt.is_some())
            .finish()
    }
}
