/// Identifies one outbound request made through a [`Slot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn token(self) -> u64 {
        self.0
    }
}

/// A single "current request" context.
///
/// Each request gets a ticket with a monotonic token. At most one ticket is in
/// flight; a completion only counts if its ticket is still the current one.
#[derive(Debug, Default)]
pub struct Slot {
    generation: u64,
    in_flight: Option<u64>,
}

impl Slot {
    /// Starts a request, or returns `None` while another one is in flight.
    pub fn begin(&mut self) -> Option<Ticket> {
        if self.in_flight.is_some() {
            return None;
        }
        self.generation += 1;
        self.in_flight = Some(self.generation);
        Some(Ticket(self.generation))
    }

    /// Finishes `ticket`. Returns `false` for a stale ticket, whose result
    /// must be discarded.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        if self.in_flight == Some(ticket.0) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Invalidates the outstanding ticket, if any, and frees the slot.
    pub fn supersede(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Runs a cleanup closure when dropped, unless [`OnCancel::disarm`] was
/// called first. Controllers hold one across each await so a dropped future
/// still releases its slot.
pub(crate) struct OnCancel<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnCancel<F> {
    pub(crate) fn new(cleanup: F) -> Self {
        Self(Some(cleanup))
    }

    /// The request ran to completion; skip the cleanup.
    pub(crate) fn disarm(mut self) {
        self.0 = None;
    }
}

impl<F: FnOnce()> Drop for OnCancel<F> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.0.take() {
            cleanup();
        }
    }
}
