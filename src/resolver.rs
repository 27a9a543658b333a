//! Lookup dispatch
//!
//! [`Resolver`] ties one helper invocation to one fill attempt for every
//! verb the host can ask for. It owns the enumeration cursors, so separate
//! resolvers run separate sessions.

use std::io::Write;

use tracing::{debug, warn};

use crate::buffer::BufferWriter;
use crate::enumeration::EnumerationState;
use crate::error::{MalformedReply, NssError, Result, Unavailable};
use crate::records::Record;
use crate::script_runner::{Helper, RawReply};
use crate::types::{HelperStatus, Verb};

/// Longest decimal rendering of a `u64`
const DECIMAL_SCRATCH: usize = 20;

#[derive(Debug)]
pub struct Resolver<H> {
    helper: H,
    state: EnumerationState,
}

impl<H: Helper> Resolver<H> {
    pub fn new(helper: H) -> Self {
        Self::with_state(helper, EnumerationState::new())
    }

    pub fn with_state(helper: H, state: EnumerationState) -> Self {
        Self { helper, state }
    }

    #[inline]
    pub fn helper(&self) -> &H {
        &self.helper
    }

    #[inline]
    pub fn state(&self) -> &EnumerationState {
        &self.state
    }

    /// Start an enumeration session for `R`.
    ///
    /// The helper is told, but its answer is ignored: the cursor belongs to
    /// this resolver and starting over always succeeds.
    pub fn begin<R: Record>(&self) -> Result<()> {
        self.notify(R::KIND.begin_verb());
        self.state.reset(R::KIND);
        Ok(())
    }

    /// Finish an enumeration session for `R`. Never fails.
    pub fn end<R: Record>(&self) -> Result<()> {
        self.notify(R::KIND.end_verb());
        self.state.reset(R::KIND);
        Ok(())
    }

    /// Fetch the record at the current cursor and advance past it.
    ///
    /// The cursor only moves when `out` was filled, so a retry after
    /// [`NssError::BufferTooSmall`] asks for the same record again.
    pub fn next<R: Record>(&self, out: &mut R, buf: &mut BufferWriter<'_>) -> Result<()> {
        let mut cursor = self.state.lock(R::KIND);
        let mut scratch = [0u8; DECIMAL_SCRATCH];
        let index = format_decimal(*cursor, &mut scratch);

        self.fetch(R::KIND.next_verb(), Some(index), out, buf)?;
        *cursor += 1;
        Ok(())
    }

    pub fn get_by_name<R: Record>(
        &self,
        name: &str,
        out: &mut R,
        buf: &mut BufferWriter<'_>,
    ) -> Result<()> {
        self.fetch(R::KIND.by_name_verb(), Some(name), out, buf)
    }

    pub fn get_by_id<R: Record>(&self, id: u32, out: &mut R, buf: &mut BufferWriter<'_>) -> Result<()> {
        let verb = R::KIND
            .by_id_verb()
            .ok_or(Unavailable::UnsupportedLookup(R::KIND))?;
        let mut scratch = [0u8; DECIMAL_SCRATCH];
        let id = format_decimal(u64::from(id), &mut scratch);
        self.fetch(verb, Some(id), out, buf)
    }

    fn fetch<R: Record>(
        &self,
        verb: Verb,
        argument: Option<&str>,
        out: &mut R,
        buf: &mut BufferWriter<'_>,
    ) -> Result<()> {
        let mut reply = RawReply::new();
        match self.helper.run(verb, argument, Some(&mut reply)) {
            HelperStatus::Success => {}
            HelperStatus::NotFound => return Err(NssError::NotFound),
            HelperStatus::TryAgain => return Err(NssError::TryAgain),
            HelperStatus::Unavailable => return Err(Unavailable::HelperFailed.into()),
        }

        let Some(line) = reply.line() else {
            debug!("{} {:?}: helper succeeded without output", verb, argument);
            return Err(NssError::NotFound);
        };
        let line = std::str::from_utf8(line).map_err(|_| MalformedReply::InvalidUtf8)?;

        out.fill(line, buf).inspect_err(|e| {
            if let NssError::Malformed(reason) = e {
                warn!("{} {:?}: rejected helper reply: {}", verb, argument, reason);
            }
        })
    }

    fn notify(&self, verb: Verb) {
        let status = self.helper.run(verb, None, None);
        debug!("{} -> {} (ignored)", verb, status);
    }
}

/// Render `value` into `scratch` without allocating
fn format_decimal(value: u64, scratch: &mut [u8; DECIMAL_SCRATCH]) -> &str {
    let mut cursor = &mut scratch[..];
    let written = match write!(cursor, "{}", value) {
        Ok(()) => DECIMAL_SCRATCH - cursor.len(),
        Err(e) => {
            debug_assert!(false, "{} does not fit in {} bytes: {}", value, DECIMAL_SCRATCH, e);
            warn!("cannot format enumeration index {}", value);
            0
        }
    };
    std::str::from_utf8(&scratch[..written]).unwrap_or_default()
}
