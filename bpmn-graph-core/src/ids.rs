use uuid::Uuid;

// ─── Id generation ────────────────────────────────────────────

/// Source of fresh identifiers.
///
/// Process ids, repaired element ids and invisible-task ids all come from
/// here. Production uses [`UuidIdSource`]; tests inject [`CountingIdSource`]
/// so the emitted statement stream is reproducible.
pub trait IdSource {
    /// A fresh UUID in canonical hyphenated form.
    fn fresh_uuid(&mut self) -> String;

    /// `len` fresh lowercase hex characters.
    fn fresh_hex(&mut self, len: usize) -> String;
}

/// Random ids backed by UUID v4.
#[derive(Debug, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn fresh_uuid(&mut self) -> String {
        Uuid::new_v4().to_string()
    }

    fn fresh_hex(&mut self, len: usize) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        hex[..len.min(hex.len())].to_string()
    }
}

/// Deterministic counter-based ids.
#[derive(Debug, Default)]
pub struct CountingIdSource {
    counter: u64,
}

impl CountingIdSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }
}

impl IdSource for CountingIdSource {
    fn fresh_uuid(&mut self) -> String {
        format!("00000000-0000-0000-0000-{:012}", self.next())
    }

    fn fresh_hex(&mut self, len: usize) -> String {
        format!("{:0width$x}", self.next(), width = len)
    }
}
