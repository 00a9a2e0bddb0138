use tokio_util::sync::CancellationToken;

/// The one in-flight compaction, if any.
#[derive(Debug)]
pub struct CompactionHandle {
    generation: u64,
    token: CancellationToken,
}

impl CompactionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holds at most one [`CompactionHandle`]. Starting a new compaction cancels
/// the previous one.
#[derive(Debug, Default)]
pub struct CompactionSlot {
    last_generation: u64,
    active: Option<CompactionHandle>,
}

impl CompactionSlot {
    /// Cancels any running compaction and registers a new one. Returns the
    /// new generation and a token for the request.
    pub fn start(&mut self) -> (u64, CancellationToken) {
        self.cancel();
        self.last_generation += 1;
        let token = CancellationToken::new();
        self.active = Some(CompactionHandle {
            generation: self.last_generation,
            token: token.clone(),
        });
        (self.last_generation, token)
    }

    /// Cancels the running compaction. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Clears the slot if `generation` is still the active compaction.
    pub fn finish(&mut self, generation: u64) -> bool {
        if self.active_generation() == Some(generation) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn active_generation(&self) -> Option<u64> {
        self.active.as_ref().map(CompactionHandle::generation)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}
