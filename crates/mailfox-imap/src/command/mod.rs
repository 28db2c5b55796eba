//! IMAP commands and their wire form.

mod tag_generator;

pub use tag_generator::TagGenerator;

/// Commands the client issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN user password.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// LIST reference pattern.
    List {
        /// Reference name (usually empty).
        reference: String,
        /// Mailbox pattern with wildcards.
        pattern: String,
    },
    /// SELECT mailbox.
    Select {
        /// Mailbox name.
        mailbox: String,
    },
    /// SEARCH with pre-rendered criteria (e.g. `ALL`, `TEXT "term"`).
    Search {
        /// Criteria, written verbatim.
        criteria: String,
    },
    /// FETCH id RFC822.
    FetchRfc822 {
        /// Message sequence number.
        id: String,
    },
    /// CLOSE.
    Close,
    /// LOGOUT.
    Logout,
}

impl Command {
    /// Returns the command name for logging. Never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::List { .. } => "LIST",
            Self::Select { .. } => "SELECT",
            Self::Search { .. } => "SEARCH",
            Self::FetchRfc822 { .. } => "FETCH",
            Self::Close => "CLOSE",
            Self::Logout => "LOGOUT",
        }
    }

    /// Serializes the command with `tag`.
    ///
    /// The result is split at synchronizing literals: every segment after
    /// the first must only be sent once the server answered the previous
    /// one with a `+` continuation.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<Vec<u8>> {
        let mut writer = SegmentWriter::new();
        writer.extend(tag.as_bytes());
        writer.push(b' ');
        writer.extend(self.name().as_bytes());

        match self {
            Self::Login { username, password } => {
                writer.push(b' ');
                writer.astring(username);
                writer.push(b' ');
                writer.astring(password);
            }
            Self::List { reference, pattern } => {
                writer.push(b' ');
                writer.astring(reference);
                writer.push(b' ');
                writer.list_mailbox(pattern);
            }
            Self::Select { mailbox } => {
                writer.push(b' ');
                writer.astring(mailbox);
            }
            Self::Search { criteria } => {
                writer.push(b' ');
                writer.extend(criteria.as_bytes());
            }
            Self::FetchRfc822 { id } => {
                writer.push(b' ');
                writer.extend(id.as_bytes());
                writer.extend(b" RFC822");
            }
            Self::Close | Self::Logout => {}
        }

        writer.extend(b"\r\n");
        writer.finish()
    }
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']') || b < 0x20 || b == 0x7F
}

/// Returns true if the byte cannot appear in a quoted string.
const fn needs_literal(b: u8) -> bool {
    b == b'\r' || b == b'\n' || b == 0 || b > 0x7F
}

/// Builds the command bytes, cutting a new segment after each literal header.
struct SegmentWriter {
    segments: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl SegmentWriter {
    const fn new() -> Self {
        Self {
            segments: Vec::new(),
            current: Vec::new(),
        }
    }

    fn push(&mut self, b: u8) {
        self.current.push(b);
    }

    fn extend(&mut self, bytes: &[u8]) {
        self.current.extend_from_slice(bytes);
    }

    /// Writes an atom, a quoted string, or a literal, whichever fits.
    fn astring(&mut self, s: &str) {
        if s.bytes().any(needs_literal) {
            self.literal(s.as_bytes());
        } else if s.is_empty() || s.bytes().any(needs_quoting) {
            self.quoted(s);
        } else {
            self.extend(s.as_bytes());
        }
    }

    /// Like [`Self::astring`] but keeps `%` and `*` wildcards unquoted.
    fn list_mailbox(&mut self, s: &str) {
        if !s.is_empty() && s.bytes().all(|b| matches!(b, b'%' | b'*') || !needs_quoting(b)) {
            self.extend(s.as_bytes());
        } else {
            self.astring(s);
        }
    }

    fn quoted(&mut self, s: &str) {
        self.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                self.push(b'\\');
            }
            self.push(b);
        }
        self.push(b'"');
    }

    fn literal(&mut self, data: &[u8]) {
        self.extend(format!("{{{}}}\r\n", data.len()).as_bytes());
        self.segments.push(std::mem::take(&mut self.current));
        self.extend(data);
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.segments.push(self.current);
        self.segments
    }
}

/// Quotes a string for use inside SEARCH criteria.
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
