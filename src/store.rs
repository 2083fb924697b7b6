//! Persistent profile catalog over a byte-addressed memory.
//!
//! Layout (field widths are a bit-exact contract with the host tool):
//!
//! ```text
//! [0 .. 9)     signature "VLReflow\0"
//! [9 .. len)   catalog records, back to back:
//!                name[20]        NUL-terminated ASCII
//!                phases_count    i16, native endianness
//!                phase[0..n]:    name[11] | end_temp f64 | slope f64 | duration i32
//! ```
//!
//! A record whose first name byte is zero marks end-of-catalog. Profiles
//! are never edited in place; the only mutations are [`ProfileStore::format`]
//! and [`ProfileStore::append`]. Appends write the phase records before the
//! header, so a write torn by power loss leaves the sentinel intact and the
//! scanner never sees a half-written record.

use log::{info, warn};

use crate::app::ports::NvMemory;
use crate::config::{MAX_PHASES, PHASE_NAME_LEN, PROFILE_NAME_LEN};
use crate::error::StoreError;
use crate::profile::{default_profiles, Phase, PhaseList, Profile, ProfileName};

/// Signature bytes at offset 0.
pub const SIGNATURE: &[u8; 9] = b"VLReflow\0";

/// Length of the signature region.
pub const SIG_LEN: usize = SIGNATURE.len();

/// Profile name field width, NUL included.
const HEADER_NAME_FIELD: usize = PROFILE_NAME_LEN + 1;

/// Catalog record header: name field plus i16 phase count.
pub const HEADER_SIZE: usize = HEADER_NAME_FIELD + 2;

/// Phase name field width, NUL included.
const PHASE_NAME_FIELD: usize = PHASE_NAME_LEN + 1;

/// One serialized phase: name field, end_temp, slope, duration.
pub const PHASE_RECORD_SIZE: usize = PHASE_NAME_FIELD + 8 + 8 + 4;

// ---------------------------------------------------------------------------
// Record header
// ---------------------------------------------------------------------------

/// Decoded catalog record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileHeader {
    pub name: ProfileName,
    pub phases_count: i16,
}

/// Store summary for the `e inf` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreInfo {
    pub sig_ok: bool,
    pub len: usize,
    /// First free byte, `None` when the catalog is full.
    pub free_start: Option<usize>,
}

/// Outcome of the boot-time catalog initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStatus {
    /// Signature valid, catalog usable as found.
    Ready,
    /// Signature was invalid; store reformatted and defaults installed.
    Formatted,
    /// Signature invalid and the operator declined the reformat. The
    /// catalog is unusable; the controller boots idle with no profile.
    Unformatted,
}

// ---------------------------------------------------------------------------
// ProfileStore
// ---------------------------------------------------------------------------

/// Append-only profile catalog on top of an [`NvMemory`].
pub struct ProfileStore<M: NvMemory> {
    mem: M,
}

impl<M: NvMemory> ProfileStore<M> {
    pub fn new(mem: M) -> Self {
        Self { mem }
    }

    /// Total backing-memory capacity in bytes.
    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    /// Raw read for diagnostic dumps (`e d`).
    pub fn read_raw(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        self.mem.read(offset, buf)
    }

    // ── Signature ─────────────────────────────────────────────

    /// True iff the signature bytes equal the expected constant.
    pub fn validate_signature(&self) -> bool {
        let mut buf = [0u8; SIG_LEN];
        match self.mem.read(0, &mut buf) {
            Ok(()) => buf == *SIGNATURE,
            Err(_) => false,
        }
    }

    /// Write the signature and zero-fill the catalog region.
    pub fn format(&mut self) -> Result<(), StoreError> {
        self.mem.write(0, SIGNATURE)?;
        let zeros = [0u8; 64];
        let mut off = SIG_LEN;
        while off < self.mem.len() {
            let n = zeros.len().min(self.mem.len() - off);
            self.mem.write(off, &zeros[..n])?;
            off += n;
        }
        info!("store formatted ({} bytes)", self.mem.len());
        Ok(())
    }

    /// Boot-time integrity check. A bad signature is only repaired with
    /// explicit operator consent; refusal leaves the store untouched.
    pub fn initialize(&mut self, consent_to_format: bool) -> Result<BootStatus, StoreError> {
        if self.validate_signature() {
            return Ok(BootStatus::Ready);
        }
        if !consent_to_format {
            warn!("store signature invalid, reformat declined");
            return Ok(BootStatus::Unformatted);
        }
        self.format()?;
        self.register_defaults()?;
        Ok(BootStatus::Formatted)
    }

    // ── Catalog scan ──────────────────────────────────────────

    /// Number of records in the catalog.
    pub fn count(&self) -> usize {
        let mut n = 0;
        let mut off = SIG_LEN;
        while let Some(header) = self.header_at(off) {
            n += 1;
            off += record_len(&header);
        }
        n
    }

    /// First byte past the last record; `None` if no further record could
    /// even begin.
    pub fn find_free_offset(&self) -> Option<usize> {
        let mut off = SIG_LEN;
        while let Some(header) = self.header_at(off) {
            off = off.checked_add(record_len(&header))?;
        }
        if off + HEADER_SIZE > self.mem.len() {
            None
        } else {
            Some(off)
        }
    }

    /// Header of the `index`-th record and its byte offset.
    pub fn load_header(&self, index: usize) -> Option<(ProfileHeader, usize)> {
        let mut off = SIG_LEN;
        let mut i = 0;
        while let Some(header) = self.header_at(off) {
            if i == index {
                return Some((header, off));
            }
            off += record_len(&header);
            i += 1;
        }
        None
    }

    /// Fully decode the `index`-th profile.
    pub fn load_profile(&self, index: usize) -> Option<Profile> {
        let (header, off) = self.load_header(index)?;
        let count = header.phases_count as usize;
        if count > MAX_PHASES {
            warn!(
                "catalog entry {} declares {} phases, capacity is {}",
                index, count, MAX_PHASES
            );
            return None;
        }

        let mut phases = PhaseList::new();
        for k in 0..count {
            let phase = self.phase_at(off + HEADER_SIZE + k * PHASE_RECORD_SIZE)?;
            // Cannot fail: count was bounds-checked above.
            let _ = phases.push(phase);
        }
        Some(Profile {
            name: header.name,
            phases,
        })
    }

    // ── Mutation ──────────────────────────────────────────────

    /// Append a profile at the free offset. Phases are written first and
    /// the header last; see the module docs for the torn-append argument.
    pub fn append(&mut self, profile: &Profile) -> Result<(), StoreError> {
        let off = self.find_free_offset().ok_or(StoreError::Full)?;
        let total = HEADER_SIZE + profile.phases.len() * PHASE_RECORD_SIZE;
        if off + total > self.mem.len() {
            return Err(StoreError::Full);
        }

        for (k, phase) in profile.phases.iter().enumerate() {
            let mut rec = [0u8; PHASE_RECORD_SIZE];
            encode_name(&mut rec[..PHASE_NAME_FIELD], phase.name.as_str());
            rec[PHASE_NAME_FIELD..PHASE_NAME_FIELD + 8]
                .copy_from_slice(&phase.end_temp.to_ne_bytes());
            rec[PHASE_NAME_FIELD + 8..PHASE_NAME_FIELD + 16]
                .copy_from_slice(&phase.slope.to_ne_bytes());
            rec[PHASE_NAME_FIELD + 16..PHASE_RECORD_SIZE]
                .copy_from_slice(&phase.duration.to_ne_bytes());
            self.mem
                .write(off + HEADER_SIZE + k * PHASE_RECORD_SIZE, &rec)?;
        }

        let mut hdr = [0u8; HEADER_SIZE];
        encode_name(&mut hdr[..HEADER_NAME_FIELD], profile.name.as_str());
        hdr[HEADER_NAME_FIELD..HEADER_SIZE]
            .copy_from_slice(&(profile.phases.len() as i16).to_ne_bytes());
        self.mem.write(off, &hdr)?;

        info!(
            "appended profile \"{}\" ({} phases) at offset {}",
            profile.name,
            profile.phases.len(),
            off
        );
        Ok(())
    }

    /// Install the default catalog (two profiles) onto a formatted store.
    pub fn register_defaults(&mut self) -> Result<(), StoreError> {
        for profile in default_profiles() {
            self.append(&profile)?;
        }
        Ok(())
    }

    /// Summary for the `e inf` command.
    pub fn info(&self) -> StoreInfo {
        StoreInfo {
            sig_ok: self.validate_signature(),
            len: self.mem.len(),
            free_start: self.find_free_offset(),
        }
    }

    // ── Internal decoding ─────────────────────────────────────

    /// Decode a header at `offset`; `None` for the end sentinel, a header
    /// that does not fit, or a corrupt record (scan stops there).
    fn header_at(&self, offset: usize) -> Option<ProfileHeader> {
        if offset + HEADER_SIZE > self.mem.len() {
            return None;
        }
        let mut buf = [0u8; HEADER_SIZE];
        self.mem.read(offset, &mut buf).ok()?;
        if buf[0] == 0 {
            return None;
        }
        let Some(name) = decode_name::<PROFILE_NAME_LEN>(&buf[..HEADER_NAME_FIELD]) else {
            warn!("corrupt profile name at offset {}", offset);
            return None;
        };
        let phases_count =
            i16::from_ne_bytes([buf[HEADER_NAME_FIELD], buf[HEADER_NAME_FIELD + 1]]);
        if phases_count < 1 {
            warn!("corrupt phase count {} at offset {}", phases_count, offset);
            return None;
        }
        Some(ProfileHeader { name, phases_count })
    }

    fn phase_at(&self, offset: usize) -> Option<Phase> {
        if offset + PHASE_RECORD_SIZE > self.mem.len() {
            return None;
        }
        let mut buf = [0u8; PHASE_RECORD_SIZE];
        self.mem.read(offset, &mut buf).ok()?;
        let name = decode_name::<PHASE_NAME_LEN>(&buf[..PHASE_NAME_FIELD])?;
        let end_temp = f64::from_ne_bytes(
            buf[PHASE_NAME_FIELD..PHASE_NAME_FIELD + 8].try_into().ok()?,
        );
        let slope = f64::from_ne_bytes(
            buf[PHASE_NAME_FIELD + 8..PHASE_NAME_FIELD + 16]
                .try_into()
                .ok()?,
        );
        let duration = i32::from_ne_bytes(
            buf[PHASE_NAME_FIELD + 16..PHASE_RECORD_SIZE].try_into().ok()?,
        );
        Some(Phase {
            name,
            end_temp,
            slope,
            duration,
        })
    }
}

/// Byte length of the record described by `header`.
fn record_len(header: &ProfileHeader) -> usize {
    HEADER_SIZE + header.phases_count as usize * PHASE_RECORD_SIZE
}

/// Write `name` into a NUL-terminated field, zero-padding the remainder.
fn encode_name(field: &mut [u8], name: &str) {
    let bytes = name.as_bytes();
    let n = bytes.len().min(field.len() - 1);
    field[..n].copy_from_slice(&bytes[..n]);
    for b in &mut field[n..] {
        *b = 0;
    }
}

/// Decode a NUL-terminated ASCII field. `None` if no NUL is present
/// within the field or the content is not ASCII.
fn decode_name<const N: usize>(field: &[u8]) -> Option<heapless::String<N>> {
    let nul = field.iter().position(|&b| b == 0)?;
    let bytes = &field[..nul];
    if !bytes.is_ascii() {
        return None;
    }
    let s = core::str::from_utf8(bytes).ok()?;
    let mut out = heapless::String::new();
    out.push_str(s).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::MemStore;
    use crate::profile::Phase;

    fn store(len: usize) -> ProfileStore<MemStore> {
        ProfileStore::new(MemStore::new(len))
    }

    fn one_phase_profile(name: &str) -> Profile {
        let mut phases = PhaseList::new();
        let _ = phases.push(Phase::new("P", 100.0, 2.0, 0));
        Profile::new(name, phases)
    }

    #[test]
    fn record_sizes_are_contractual() {
        assert_eq!(SIG_LEN, 9);
        assert_eq!(HEADER_SIZE, 22);
        assert_eq!(PHASE_RECORD_SIZE, 31);
    }

    #[test]
    fn blank_memory_fails_signature() {
        let s = store(1024);
        assert!(!s.validate_signature());
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn format_installs_signature_and_empty_catalog() {
        let mut s = store(1024);
        s.format().unwrap();
        assert!(s.validate_signature());
        assert_eq!(s.count(), 0);
        assert_eq!(s.find_free_offset(), Some(SIG_LEN));
    }

    #[test]
    fn append_then_load_round_trips() {
        let mut s = store(1024);
        s.format().unwrap();
        let p = one_phase_profile("test");
        s.append(&p).unwrap();
        assert_eq!(s.count(), 1);
        assert_eq!(s.load_profile(0).unwrap(), p);
        assert!(s.load_profile(1).is_none());
    }

    #[test]
    fn load_header_reports_offsets() {
        let mut s = store(1024);
        s.format().unwrap();
        s.append(&one_phase_profile("a")).unwrap();
        s.append(&one_phase_profile("b")).unwrap();

        let (h0, off0) = s.load_header(0).unwrap();
        assert_eq!(h0.name.as_str(), "a");
        assert_eq!(off0, SIG_LEN);

        let (h1, off1) = s.load_header(1).unwrap();
        assert_eq!(h1.name.as_str(), "b");
        assert_eq!(off1, SIG_LEN + HEADER_SIZE + PHASE_RECORD_SIZE);
    }

    #[test]
    fn defaults_install_two_profiles() {
        let mut s = store(1024);
        s.format().unwrap();
        s.register_defaults().unwrap();
        assert_eq!(s.count(), 2);
        let reflow = s.load_profile(1).unwrap();
        assert_eq!(reflow.name.as_str(), "PbFree - Reflow");
        assert_eq!(reflow.phases.len(), 8);
    }

    #[test]
    fn initialize_with_consent_formats_and_registers() {
        let mut s = store(1024);
        assert_eq!(s.initialize(true).unwrap(), BootStatus::Formatted);
        assert_eq!(s.count(), 2);
        // Second boot finds the signature valid.
        assert_eq!(s.initialize(true).unwrap(), BootStatus::Ready);
    }

    #[test]
    fn initialize_without_consent_leaves_store_alone() {
        let mut s = store(1024);
        assert_eq!(s.initialize(false).unwrap(), BootStatus::Unformatted);
        assert!(!s.validate_signature());
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn append_fails_when_full_without_corrupting() {
        // Room for the signature and exactly one minimum-sized record.
        let mut s = store(SIG_LEN + HEADER_SIZE + PHASE_RECORD_SIZE + 4);
        s.format().unwrap();
        s.append(&one_phase_profile("only")).unwrap();

        let err = s.append(&one_phase_profile("more")).unwrap_err();
        assert_eq!(err, StoreError::Full);
        assert_eq!(s.count(), 1);
        assert_eq!(s.load_profile(0).unwrap().name.as_str(), "only");
    }

    #[test]
    fn torn_append_is_invisible() {
        let mut s = store(1024);
        s.format().unwrap();
        s.append(&one_phase_profile("ok")).unwrap();

        // Simulate a power loss that wrote phase bytes past the first
        // record but never the header: the sentinel byte stays zero.
        let free = s.find_free_offset().unwrap();
        let garbage = [0xAAu8; PHASE_RECORD_SIZE];
        s.mem.write(free + HEADER_SIZE, &garbage).unwrap();

        assert_eq!(s.count(), 1);
        assert_eq!(s.find_free_offset(), Some(free));
    }

    #[test]
    fn info_reflects_state() {
        let mut s = store(1024);
        let blank = s.info();
        assert!(!blank.sig_ok);

        s.format().unwrap();
        s.register_defaults().unwrap();
        let info = s.info();
        assert!(info.sig_ok);
        assert_eq!(info.len, 1024);
        let expected =
            SIG_LEN + 2 * HEADER_SIZE + (2 + 8) * PHASE_RECORD_SIZE;
        assert_eq!(info.free_start, Some(expected));
    }

    #[test]
    fn name_codec_requires_nul() {
        let field = [b'x'; HEADER_NAME_FIELD];
        assert!(decode_name::<PROFILE_NAME_LEN>(&field).is_none());

        let mut field = [0u8; HEADER_NAME_FIELD];
        field[..3].copy_from_slice(b"abc");
        assert_eq!(
            decode_name::<PROFILE_NAME_LEN>(&field).unwrap().as_str(),
            "abc"
        );
    }
}
