use ulid::Ulid;

const SESSION_LEN: usize = 8;

/// Hands out short DOM-id-safe anchor identifiers.
///
/// Each allocator draws a random session prefix once and appends a counter,
/// so ids never repeat within one allocator and two allocators (one per file)
/// collide only if their 41-bit sessions do. Nothing is persisted across builds.
#[derive(Debug, Clone)]
pub struct IdentifierAllocator {
    session: String,
    next: u64,
}

impl IdentifierAllocator {
    pub fn new() -> Self {
        Self::with_seed(Ulid::new().random() as u64)
    }

    /// Deterministic allocator, for tests and reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        let mut session = to_base36(seed);
        if session.len() > SESSION_LEN {
            session = session.split_off(session.len() - SESSION_LEN);
        }
        while session.len() < SESSION_LEN {
            session.insert(0, '0');
        }
        Self { session, next: 0 }
    }

    /// Next identifier: `s` + session + counter, all lowercase alphanumerics.
    ///
    /// The leading letter keeps the id usable in a `#id` selector.
    pub fn allocate(&mut self) -> String {
        let id = format!("s{}{}", self.session, to_base36(self.next));
        self.next += 1;
        id
    }
}

impl Default for IdentifierAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
