//! Saturating 8-bit countdown timers.
//!
//! With the `atomic` feature the counter is an `AtomicU8`, so a host
//! interrupt handler may read it while the engine ticks on the main
//! context. The engine itself never shares a timer between threads.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Still counting down.
    On,
    /// Was already at zero.
    Off,
    /// This decrement reached zero.
    Finished,
}

#[cfg(not(feature = "atomic"))]
mod imp {
    #[derive(Debug)]
    pub struct Repr(u8);

    impl Repr {
        pub const fn new() -> Self {
            Self(0)
        }

        #[inline]
        pub fn set(&mut self, value: u8) {
            self.0 = value;
        }

        #[inline]
        pub fn get(&self) -> u8 {
            self.0
        }

        #[inline]
        pub fn saturating_decrement(&mut self) -> u8 {
            let previous = self.0;
            self.0 = previous.saturating_sub(1);
            previous
        }
    }
}

#[cfg(feature = "atomic")]
mod imp {
    use core::sync::atomic::{AtomicU8, Ordering};

    #[derive(Debug)]
    pub struct Repr(AtomicU8);

    impl Repr {
        pub const fn new() -> Self {
            Self(AtomicU8::new(0))
        }

        #[inline]
        pub fn set(&mut self, value: u8) {
            self.0.store(value, Ordering::Release);
        }

        #[inline]
        pub fn get(&self) -> u8 {
            self.0.load(Ordering::Acquire)
        }

        #[inline]
        pub fn saturating_decrement(&mut self) -> u8 {
            match self
                .0
                .fetch_update(Ordering::Release, Ordering::Relaxed, |value| {
                    Some(value.saturating_sub(1))
                }) {
                Ok(previous) => previous,
                Err(_) => 0,
            }
        }
    }
}

#[derive(Debug)]
pub struct Timer(imp::Repr);

impl Timer {
    pub const fn new() -> Self {
        Self(imp::Repr::new())
    }

    #[inline]
    pub fn set(&mut self, value: u8) {
        self.0.set(value);
    }

    #[inline]
    pub fn get(&self) -> u8 {
        self.0.get()
    }

    /// Decrement by one, saturating at zero, and report the transition.
    #[inline]
    pub fn tick(&mut self) -> TimerState {
        match self.0.saturating_decrement() {
            0 => TimerState::Off,
            1 => TimerState::Finished,
            _ => TimerState::On,
        }
    }
}
